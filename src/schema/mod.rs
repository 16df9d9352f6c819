//! Schema module - message and field descriptors.
//!
//! The handler registry compiles a [`SchemaPool`] into handler tables. The
//! pool is plain serde data: build it in code, or load it from JSON or
//! MsgPack.
//!
//! # Example
//!
//! ```
//! use protodispatch::protocol::FieldType;
//! use protodispatch::schema::{FieldDef, MessageDef, SchemaPool};
//!
//! let mut pool = SchemaPool::new();
//! pool.add(
//!     MessageDef::new("example.Node")
//!         .field(FieldDef::scalar("value", 1, FieldType::Int32))
//!         .field(FieldDef::message("children", 2, "example.Node").repeated()),
//! );
//!
//! assert!(pool.validate().is_ok());
//! assert_eq!(pool.get("example.Node").unwrap().fields.len(), 2);
//! ```

mod def;
mod pool;

pub use def::{FieldDef, Label, MessageDef};
pub use pool::SchemaPool;
