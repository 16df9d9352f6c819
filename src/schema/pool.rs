//! Schema pool - a set of message descriptors addressable by full name.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::MessageDef;
use crate::codec::{JsonCodec, MsgPackCodec};
use crate::error::{Error, Result};
use crate::protocol::{FieldType, MAX_FIELD_NUMBER};

/// Collection of message descriptors.
///
/// Serialized as a plain list of messages; the name index is rebuilt on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<MessageDef>", into = "Vec<MessageDef>")]
pub struct SchemaPool {
    /// Messages in insertion order.
    messages: Vec<MessageDef>,
    /// Full name to position in `messages`.
    by_name: HashMap<String, usize>,
}

impl SchemaPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message, replacing any previous message with the same full name.
    pub fn add(&mut self, def: MessageDef) -> &mut Self {
        match self.by_name.get(&def.full_name) {
            Some(&idx) => self.messages[idx] = def,
            None => {
                self.by_name.insert(def.full_name.clone(), self.messages.len());
                self.messages.push(def);
            }
        }
        self
    }

    /// Get a message by full name.
    pub fn get(&self, full_name: &str) -> Option<&MessageDef> {
        self.by_name.get(full_name).map(|&idx| &self.messages[idx])
    }

    /// Iterate messages in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &MessageDef> {
        self.messages.iter()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Check that the pool can be compiled into handler tables.
    ///
    /// Every message/group field must name a message in this pool, field
    /// numbers must be legal and unique per message, and the synthetic
    /// end-of-group type may not be declared.
    pub fn validate(&self) -> Result<()> {
        for msg in &self.messages {
            let mut numbers = HashSet::new();
            for field in &msg.fields {
                if field.number == 0 || field.number > MAX_FIELD_NUMBER {
                    return Err(Error::Schema(format!(
                        "{}.{}: field number {} out of range",
                        msg.full_name, field.name, field.number
                    )));
                }
                if !numbers.insert(field.number) {
                    return Err(Error::Schema(format!(
                        "{}: duplicate field number {}",
                        msg.full_name, field.number
                    )));
                }
                if field.field_type == FieldType::EndGroup {
                    return Err(Error::Schema(format!(
                        "{}.{}: endgroup is not a declarable type",
                        msg.full_name, field.name
                    )));
                }
                if field.is_submessage() {
                    let target = field.type_name.as_deref().ok_or_else(|| {
                        Error::Schema(format!(
                            "{}.{}: message field without type name",
                            msg.full_name, field.name
                        ))
                    })?;
                    if self.get(target).is_none() {
                        return Err(Error::UnknownMessage(target.to_string()));
                    }
                }
            }
        }
        Ok(())
    }

    /// Load and validate a pool from JSON.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let pool: Self = JsonCodec::decode(bytes)?;
        pool.validate()?;
        Ok(pool)
    }

    /// Load and validate a pool from MsgPack.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        let pool: Self = MsgPackCodec::decode(bytes)?;
        pool.validate()?;
        Ok(pool)
    }

    /// Serialize the pool as JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        JsonCodec::encode(self)
    }

    /// Serialize the pool as MsgPack.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        MsgPackCodec::encode(self)
    }
}

impl From<Vec<MessageDef>> for SchemaPool {
    fn from(messages: Vec<MessageDef>) -> Self {
        let mut pool = Self::new();
        for def in messages {
            pool.add(def);
        }
        pool
    }
}

impl From<SchemaPool> for Vec<MessageDef> {
    fn from(pool: SchemaPool) -> Self {
        pool.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;

    fn tree_pool() -> SchemaPool {
        let mut pool = SchemaPool::new();
        pool.add(
            MessageDef::new("t.Tree")
                .field(FieldDef::scalar("label", 1, FieldType::String))
                .field(FieldDef::message("left", 2, "t.Tree"))
                .field(FieldDef::message("right", 3, "t.Tree")),
        );
        pool
    }

    #[test]
    fn test_add_replaces_same_name() {
        let mut pool = tree_pool();
        pool.add(MessageDef::new("t.Tree"));
        assert_eq!(pool.len(), 1);
        assert!(pool.get("t.Tree").unwrap().fields.is_empty());
    }

    #[test]
    fn test_validate_accepts_self_reference() {
        assert!(tree_pool().validate().is_ok());
    }

    #[test]
    fn test_validate_dangling_reference() {
        let mut pool = SchemaPool::new();
        pool.add(MessageDef::new("t.A").field(FieldDef::message("b", 1, "t.B")));

        match pool.validate() {
            Err(Error::UnknownMessage(name)) => assert_eq!(name, "t.B"),
            other => panic!("expected UnknownMessage, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_duplicate_number() {
        let mut pool = SchemaPool::new();
        pool.add(
            MessageDef::new("t.A")
                .field(FieldDef::scalar("x", 1, FieldType::Int32))
                .field(FieldDef::scalar("y", 1, FieldType::Int64)),
        );
        assert!(matches!(pool.validate(), Err(Error::Schema(_))));
    }

    #[test]
    fn test_validate_field_number_zero() {
        let mut pool = SchemaPool::new();
        pool.add(MessageDef::new("t.A").field(FieldDef::scalar("x", 0, FieldType::Int32)));
        assert!(matches!(pool.validate(), Err(Error::Schema(_))));
    }

    #[test]
    fn test_json_round_trip_keeps_index() {
        let pool = tree_pool();
        let bytes = pool.to_json().unwrap();
        let loaded = SchemaPool::from_json(&bytes).unwrap();
        assert_eq!(loaded, pool);
        assert!(loaded.get("t.Tree").is_some());
    }

    #[test]
    fn test_msgpack_load_validates() {
        let mut pool = SchemaPool::new();
        pool.add(MessageDef::new("t.A").field(FieldDef::message("b", 1, "t.Missing")));
        let bytes = pool.to_msgpack().unwrap();

        assert!(matches!(
            SchemaPool::from_msgpack(&bytes),
            Err(Error::UnknownMessage(_))
        ));
    }

    #[test]
    fn test_from_json_text() {
        let json = br#"[
            {"full_name": "t.Point", "fields": [
                {"name": "x", "number": 1, "type": "sint32"},
                {"name": "y", "number": 2, "type": "sint32"}
            ]}
        ]"#;
        let pool = SchemaPool::from_json(json).unwrap();
        let point = pool.get("t.Point").unwrap();
        assert_eq!(point.fields[1].field_type, FieldType::SInt32);
    }
}
