//! Dispatch module - the runtime stack machine.
//!
//! A [`Dispatcher`] is bound to one frozen [`Handlers`](crate::handler::Handlers)
//! registry and driven by a decoder, one structural event at a time. It keeps a
//! bounded stack of [`Frame`]s (root, repeated field, nested message) and
//! routes each event to the callbacks of the active message.
//!
//! # Example
//!
//! ```
//! use protodispatch::dispatch::Dispatcher;
//! use protodispatch::handler::{Flow, HandlerRegistry, Status, Value};
//! use protodispatch::protocol::{FieldKey, FieldType};
//!
//! let mut registry = HandlerRegistry::<()>::new();
//! let root = registry.new_message_handlers();
//! let id = registry
//!     .message_mut(root)
//!     .unwrap()
//!     .new_field(1, FieldType::Int32, false);
//! registry
//!     .field_mut(id)
//!     .unwrap()
//!     .on_value(|_, _, v| if v.as_i64() == Some(0) { Flow::Break } else { Flow::Continue });
//! let handlers = registry.freeze();
//!
//! let mut d = Dispatcher::builder(&handlers).max_nesting(16).build();
//! d.reset(());
//! d.start_msg();
//! let field = d.lookup(FieldKey::for_field(1, FieldType::Int32)).unwrap();
//! assert_eq!(d.value(field, &Value::Int32(7)), Flow::Continue);
//!
//! let mut status = Status::new();
//! d.end_msg(&mut status);
//! assert!(status.is_ok());
//! d.teardown();
//! ```

mod config;
mod dispatcher;
mod frame;

pub use config::{DispatcherConfig, MAX_NESTING, MIN_NESTING};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use frame::{Frame, FrameKind};
