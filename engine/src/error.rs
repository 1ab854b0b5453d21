//! Error types for the mirror engine.

use thiserror::Error;

/// All possible errors from the mirror engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Payload errors
    #[error("remote entity has no string id")]
    MissingEntityId,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    // Input errors
    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("unknown collection: {0}")]
    UnknownCollection(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
