//! JSON codec using `serde_json`.

use crate::error::Result;

/// JSON codec for human-edited descriptors.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value as compact JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    /// Encode a value as indented JSON text.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    pub fn encode_pretty<T: serde::Serialize>(value: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(value)?)
    }

    /// Decode JSON bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not valid JSON for type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Field {
        number: u32,
        name: String,
    }

    #[test]
    fn test_decode_struct() {
        let decoded: Field = JsonCodec::decode(br#"{"number": 7, "name": "id"}"#).unwrap();
        assert_eq!(
            decoded,
            Field {
                number: 7,
                name: "id".to_string()
            }
        );
    }

    #[test]
    fn test_pretty_output_is_multiline() {
        let text = JsonCodec::encode_pretty(&Field {
            number: 1,
            name: "a".to_string(),
        })
        .unwrap();
        assert!(text.contains('\n'));
        let decoded: Field = JsonCodec::decode(text.as_bytes()).unwrap();
        assert_eq!(decoded.number, 1);
    }

    #[test]
    fn test_decode_error_on_invalid_data() {
        let result: Result<Field> = JsonCodec::decode(b"{\"number\": }");
        assert!(matches!(result, Err(Error::Json(_))));
    }
}
