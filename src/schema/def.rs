//! Message and field descriptors.

use serde::{Deserialize, Serialize};

use crate::protocol::FieldType;

/// Field cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Zero or one occurrence.
    #[default]
    Optional,
    /// Exactly one occurrence.
    Required,
    /// Any number of occurrences.
    Repeated,
}

/// One member of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name, unique within the message.
    pub name: String,
    /// Field number, unique within the message.
    pub number: u32,
    /// Declared type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Cardinality.
    #[serde(default)]
    pub label: Label,
    /// Fully-qualified name of the referenced message (message/group fields).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
}

impl FieldDef {
    /// Create a scalar (or string/bytes) field.
    pub fn scalar(name: &str, number: u32, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            number,
            field_type,
            label: Label::Optional,
            type_name: None,
        }
    }

    /// Create a field holding a nested message.
    pub fn message(name: &str, number: u32, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            number,
            field_type: FieldType::Message,
            label: Label::Optional,
            type_name: Some(type_name.to_string()),
        }
    }

    /// Create a group field.
    pub fn group(name: &str, number: u32, type_name: &str) -> Self {
        Self {
            field_type: FieldType::Group,
            ..Self::message(name, number, type_name)
        }
    }

    /// Mark the field as repeated.
    pub fn repeated(mut self) -> Self {
        self.label = Label::Repeated;
        self
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.label = Label::Required;
        self
    }

    /// Whether the field is a sequence.
    #[inline]
    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }

    /// Whether the field references another message.
    #[inline]
    pub fn is_submessage(&self) -> bool {
        self.field_type.is_submessage()
    }
}

/// A structured-data type: a name and its fields in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDef {
    /// Fully-qualified name, e.g. `"pkg.Outer.Inner"`.
    pub full_name: String,
    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl MessageDef {
    /// Create a message with no fields.
    pub fn new(full_name: &str) -> Self {
        Self {
            full_name: full_name.to_string(),
            fields: Vec::new(),
        }
    }

    /// Append a field.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Find a field by number.
    pub fn field_by_number(&self, number: u32) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.number == number)
    }

    /// Find a field by name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_builder() {
        let f = FieldDef::group("item", 4, "pkg.Item").repeated();
        assert_eq!(f.field_type, FieldType::Group);
        assert_eq!(f.type_name.as_deref(), Some("pkg.Item"));
        assert!(f.is_repeated());
        assert!(f.is_submessage());
    }

    #[test]
    fn test_field_lookup() {
        let m = MessageDef::new("pkg.M")
            .field(FieldDef::scalar("a", 1, FieldType::Bool))
            .field(FieldDef::scalar("b", 2, FieldType::String).required());

        assert_eq!(m.field_by_number(2).unwrap().name, "b");
        assert_eq!(m.field_by_name("a").unwrap().number, 1);
        assert_eq!(m.field_by_name("b").unwrap().label, Label::Required);
        assert!(m.field_by_number(3).is_none());
    }

    #[test]
    fn test_label_defaults_when_missing() {
        let f: FieldDef = serde_json::from_str(r#"{"name": "x", "number": 1, "type": "int32"}"#).unwrap();
        assert_eq!(f.label, Label::Optional);
        assert!(f.type_name.is_none());
    }
}
