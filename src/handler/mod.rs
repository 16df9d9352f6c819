//! Handler module - handler tables and their construction.
//!
//! Provides:
//! - [`HandlerRegistry`] - builds handler tables, by hand or from a schema
//! - [`Handlers`] - the frozen, reference-counted registry shared by dispatchers
//! - [`MessageHandlers`] / [`FieldHandlers`] - per-message and per-field callbacks
//! - [`Flow`] / [`StartFlow`] - control-flow signals returned by callbacks
//!
//! # Example
//!
//! ```
//! use protodispatch::handler::{Flow, HandlerRegistry, StartFlow};
//! use protodispatch::protocol::FieldType;
//!
//! let mut registry = HandlerRegistry::<u32>::new();
//! let root = registry.new_message_handlers();
//! let child = registry.new_message_handlers();
//!
//! registry
//!     .message_mut(root)
//!     .unwrap()
//!     .on_start_msg(|_| Flow::Continue);
//!
//! let items = registry.new_submessage_field(root, 1, FieldType::Message, true, child);
//! registry
//!     .field_mut(items)
//!     .unwrap()
//!     .on_start_submsg(|depth, _| StartFlow::ContinueWith(depth + 1))
//!     .on_end_submsg(|_, _| Flow::Continue);
//!
//! let handlers = registry.freeze();
//! assert_eq!(handlers.ref_count(), 1);
//! ```

mod callback;
mod field;
mod message;
mod registry;
mod status;
mod value;

pub use callback::{
    EndFieldHandler, EndMsgHandler, Flow, StartFieldHandler, StartFlow, StartMsgHandler,
    ValueHandler,
};
pub use field::{FieldHandlers, FieldRef};
pub use message::{MessageHandlers, MessageId};
pub use registry::{HandlerRegistry, Handlers};
pub use status::Status;
pub use value::{HandlerValue, Value};
