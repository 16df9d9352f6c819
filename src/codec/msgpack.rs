//! MsgPack codec using `rmp-serde`.
//!
//! Always encodes with `to_vec_named`: structs become maps keyed by field
//! name, so descriptors written by a newer schema version (with extra keys)
//! still decode on an older reader.
//!
//! # Example
//!
//! ```
//! use protodispatch::codec::MsgPackCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Entry {
//!     number: u32,
//!     name: String,
//! }
//!
//! let entry = Entry { number: 42, name: "id".to_string() };
//! let encoded = MsgPackCodec::encode(&entry).unwrap();
//! let decoded: Entry = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, entry);
//! ```

use crate::error::Result;

/// MessagePack codec for schema descriptors.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes (struct-as-map format).
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
