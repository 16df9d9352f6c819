//! Protocol module - wire types and field keys.
//!
//! This module holds the small amount of wire knowledge the handler core
//! needs: which wire type each field type uses, and how a field key is
//! derived from a field number and wire type.

mod wire_format;

pub use wire_format::{FieldKey, FieldType, WireType, MAX_FIELD_NUMBER, WIRE_TYPE_BITS};
