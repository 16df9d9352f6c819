//! Error types for protodispatch.

use thiserror::Error;

/// Main error type for registry construction and schema loading.
#[derive(Debug, Error)]
pub enum Error {
    /// JSON serialization/deserialization error (schema descriptors).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Schema descriptor is malformed (dangling reference, duplicate number, etc.).
    #[error("Schema error: {0}")]
    Schema(String),

    /// A message name could not be resolved in the schema pool.
    #[error("Unknown message: {0}")]
    UnknownMessage(String),

    /// A decode pass ended with an error status.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Errors recorded in a dispatcher [`Status`](crate::handler::Status).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A sequence or submessage would exceed the nesting limit.
    #[error("Nesting too deep.")]
    NestingTooDeep,

    /// Error reported by an end-of-message handler.
    #[error("{0}")]
    Handler(String),
}

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
