//! Values passed to handlers.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

/// A decoded scalar handed to a field's value handler.
///
/// String and bytes values are zero-copy slices of the decoder's input.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Double(f64),
    Float(f32),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Bool(bool),
    /// UTF-8 text, not re-validated here.
    String(Bytes),
    Bytes(Bytes),
}

impl Value {
    /// Widen any integer variant to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int32(v) => Some(i64::from(v)),
            Self::Int64(v) => Some(v),
            Self::UInt32(v) => Some(i64::from(v)),
            Self::UInt64(v) => i64::try_from(v).ok(),
            Self::Bool(v) => Some(i64::from(v)),
            _ => None,
        }
    }

    /// Payload of a string or bytes value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::String(b) | Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Text of a string value, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }
}

/// Opaque per-field value (`fval`) passed to every callback of that field.
#[derive(Clone, Default)]
pub enum HandlerValue {
    #[default]
    None,
    Int(i64),
    UInt(u64),
    Bytes(Bytes),
    /// Arbitrary shared application data.
    Shared(Arc<dyn Any + Send + Sync>),
}

impl HandlerValue {
    /// Wrap application data.
    pub fn shared<T: Any + Send + Sync>(value: T) -> Self {
        Self::Shared(Arc::new(value))
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Self::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match *self {
            Self::UInt(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Borrow shared data as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Shared(v) => v.downcast_ref::<T>(),
            _ => None,
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Debug for HandlerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Self::UInt(v) => f.debug_tuple("UInt").field(v).finish(),
            Self::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            Self::Shared(_) => f.write_str("Shared(..)"),
        }
    }
}
