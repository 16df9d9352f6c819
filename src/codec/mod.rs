//! Codec module - serialization of schema descriptors.
//!
//! Schema pools are plain serde data, so they can be shipped between the
//! process that owns the schema and the processes that decode with it:
//!
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (`to_vec_named`, struct-as-map)
//! - [`JsonCodec`] - JSON using `serde_json`, for hand-written descriptors
//!
//! # Design
//!
//! Codecs are marker structs with static methods rather than trait objects,
//! so the format is picked at compile time.
//!
//! # Example
//!
//! ```
//! use protodispatch::codec::{JsonCodec, MsgPackCodec};
//!
//! let encoded = MsgPackCodec::encode(&"hello").unwrap();
//! let decoded: String = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//!
//! let numbers: Vec<u32> = JsonCodec::decode(b"[1, 2, 3]").unwrap();
//! assert_eq!(numbers, vec![1, 2, 3]);
//! ```

mod json;
mod msgpack;

pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;
