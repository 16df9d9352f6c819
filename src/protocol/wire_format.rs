//! Wire types, field types and field keys.
//!
//! Every field type has one native wire type. A field is looked up by its
//! key, the tag a decoder would read off the wire:
//! ```text
//! ┌────────────────────────────┬──────────┐
//! │ field number               │ wire type│
//! │ bits 3..32                 │ bits 0..3│
//! └────────────────────────────┴──────────┘
//! ```

use serde::{Deserialize, Serialize};

/// Largest legal field number (29 bits).
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Number of low bits holding the wire type in a [`FieldKey`].
pub const WIRE_TYPE_BITS: u32 = 3;

/// Wire encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Base-128 varint.
    Varint = 0,
    /// Little-endian 64-bit value.
    Fixed64 = 1,
    /// Length-prefixed bytes (strings, bytes, submessages, packed arrays).
    Delimited = 2,
    /// Start of a group.
    StartGroup = 3,
    /// End of a group.
    EndGroup = 4,
    /// Little-endian 32-bit value.
    Fixed32 = 5,
}

impl WireType {
    /// Decode a wire type from the low bits of a tag.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(Self::Varint),
            1 => Some(Self::Fixed64),
            2 => Some(Self::Delimited),
            3 => Some(Self::StartGroup),
            4 => Some(Self::EndGroup),
            5 => Some(Self::Fixed32),
            _ => None,
        }
    }
}

/// Declared field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Double,
    Float,
    Int64,
    UInt64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Group,
    Message,
    Bytes,
    UInt32,
    Enum,
    SFixed32,
    SFixed64,
    SInt32,
    SInt64,
    /// Synthetic terminator registered on group handler sets.
    EndGroup,
}

impl FieldType {
    /// The wire type this field type is natively encoded with.
    pub fn native_wire_type(self) -> WireType {
        match self {
            Self::Double | Self::Fixed64 | Self::SFixed64 => WireType::Fixed64,
            Self::Float | Self::Fixed32 | Self::SFixed32 => WireType::Fixed32,
            Self::Int64
            | Self::UInt64
            | Self::Int32
            | Self::Bool
            | Self::UInt32
            | Self::Enum
            | Self::SInt32
            | Self::SInt64 => WireType::Varint,
            Self::String | Self::Bytes | Self::Message => WireType::Delimited,
            Self::Group => WireType::StartGroup,
            Self::EndGroup => WireType::EndGroup,
        }
    }

    /// Message and group fields carry a nested handler set.
    #[inline]
    pub fn is_submessage(self) -> bool {
        matches!(self, Self::Message | Self::Group)
    }

    /// Scalar types that can appear in packed repeated encodings.
    #[inline]
    pub fn is_primitive(self) -> bool {
        !matches!(
            self,
            Self::Group | Self::Message | Self::String | Self::Bytes | Self::EndGroup
        )
    }
}

/// Lookup key for a field inside one message: `number << 3 | wire type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey(u32);

impl FieldKey {
    /// Build a key from a field number and wire type.
    #[inline]
    pub fn new(number: u32, wire_type: WireType) -> Self {
        debug_assert!(number <= MAX_FIELD_NUMBER);
        Self(number << WIRE_TYPE_BITS | wire_type as u32)
    }

    /// Build the key a field of `field_type` is registered under.
    #[inline]
    pub fn for_field(number: u32, field_type: FieldType) -> Self {
        Self::new(number, field_type.native_wire_type())
    }

    /// Reinterpret a raw tag read by a decoder.
    #[inline]
    pub fn from_tag(tag: u32) -> Self {
        Self(tag)
    }

    /// Field number part of the key.
    #[inline]
    pub fn number(self) -> u32 {
        self.0 >> WIRE_TYPE_BITS
    }

    /// Wire type part of the key, if it is a known encoding.
    #[inline]
    pub fn wire_type(self) -> Option<WireType> {
        WireType::from_bits(self.0 & ((1 << WIRE_TYPE_BITS) - 1))
    }

    /// Raw tag value.
    #[inline]
    pub fn tag(self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let key = FieldKey::for_field(1, FieldType::Int32);
        assert_eq!(key.tag(), 0x08);
        assert_eq!(key.number(), 1);
        assert_eq!(key.wire_type(), Some(WireType::Varint));

        let key = FieldKey::for_field(2, FieldType::String);
        assert_eq!(key.tag(), 0x12);
    }

    #[test]
    fn test_group_and_end_group_keys_differ() {
        let start = FieldKey::for_field(5, FieldType::Group);
        let end = FieldKey::for_field(5, FieldType::EndGroup);
        assert_ne!(start, end);
        assert_eq!(start.number(), end.number());
        assert_eq!(end.wire_type(), Some(WireType::EndGroup));
    }

    #[test]
    fn test_native_wire_types() {
        assert_eq!(FieldType::Double.native_wire_type(), WireType::Fixed64);
        assert_eq!(FieldType::Float.native_wire_type(), WireType::Fixed32);
        assert_eq!(FieldType::SInt64.native_wire_type(), WireType::Varint);
        assert_eq!(FieldType::Bytes.native_wire_type(), WireType::Delimited);
        assert_eq!(FieldType::Message.native_wire_type(), WireType::Delimited);
        assert_eq!(FieldType::Group.native_wire_type(), WireType::StartGroup);
    }

    #[test]
    fn test_primitive_and_submessage_classes() {
        assert!(FieldType::Int32.is_primitive());
        assert!(FieldType::Double.is_primitive());
        assert!(!FieldType::String.is_primitive());
        assert!(!FieldType::Message.is_primitive());

        assert!(FieldType::Group.is_submessage());
        assert!(FieldType::Message.is_submessage());
        assert!(!FieldType::Bytes.is_submessage());
    }

    #[test]
    fn test_unknown_wire_type_bits() {
        assert_eq!(FieldKey::from_tag(0x0E).wire_type(), None);
        assert_eq!(WireType::from_bits(7), None);
    }

    #[test]
    fn test_field_type_serde_names() {
        let json = serde_json::to_string(&FieldType::UInt32).unwrap();
        assert_eq!(json, "\"uint32\"");
        let parsed: FieldType = serde_json::from_str("\"message\"").unwrap();
        assert_eq!(parsed, FieldType::Message);
    }
}
