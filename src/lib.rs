//! # protodispatch
//!
//! Handler tables and a bounded-depth dispatcher for streaming
//! protobuf-style decoders.
//!
//! A decoder reads the wire format; this crate decides what happens with
//! what it reads. Callers attach callbacks to messages and fields, freeze the
//! result into a shared registry, and drive a per-session [`Dispatcher`] with
//! structural events (begin/end of messages, repeated fields, nested
//! messages, scalar values).
//!
//! ## Architecture
//!
//! - **Schema** ([`schema`]): serde message descriptors, loadable from JSON or MsgPack
//! - **Handlers** ([`handler`]): per-message field tables and callbacks, built
//!   by hand or compiled from a schema, then frozen into [`Handlers`]
//! - **Dispatch** ([`dispatch`]): the stack machine that routes events to callbacks
//!
//! ## Example
//!
//! ```
//! use protodispatch::{Dispatcher, Flow, HandlerRegistry, StartFlow, Status};
//! use protodispatch::protocol::FieldType;
//! use protodispatch::schema::{FieldDef, MessageDef, SchemaPool};
//!
//! let pool = SchemaPool::from(vec![MessageDef::new("tree.Node")
//!     .field(FieldDef::scalar("value", 1, FieldType::Int32))
//!     .field(FieldDef::message("children", 2, "tree.Node").repeated())]);
//!
//! let mut registry = HandlerRegistry::<u32>::new();
//! registry
//!     .register_schema_with(&pool, "tree.Node", |_, _| {}, |field, def| {
//!         if def.is_submessage() {
//!             field.on_start_submsg(|depth, _| StartFlow::ContinueWith(depth + 1));
//!         }
//!     })
//!     .unwrap();
//! let handlers = registry.freeze();
//! assert_eq!(handlers.len(), 1);
//!
//! let mut dispatcher = Dispatcher::new(&handlers);
//! dispatcher.reset(0);
//! assert_eq!(dispatcher.start_msg(), Flow::Continue);
//!
//! let mut status = Status::new();
//! dispatcher.end_msg(&mut status);
//! assert!(status.is_ok());
//! ```

pub mod codec;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod schema;

pub use dispatch::{Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::{DispatchError, Error, Result};
pub use handler::{
    FieldHandlers, FieldRef, Flow, HandlerRegistry, HandlerValue, Handlers, MessageHandlers,
    MessageId, StartFlow, Status, Value,
};
