//! Unified error handling for the CLI.

use crate::config::ConfigError;
use crate::mirror::StoreError;
use mirror_engine::EntityId;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

/// How a failure ends the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Nothing further can work until the user fixes something.
    Fatal,
    /// This operation failed; running it again may succeed.
    Recoverable,
}

impl Severity {
    pub fn exit_code(self) -> i32 {
        match self {
            Severity::Fatal => 2,
            Severity::Recoverable => 1,
        }
    }
}

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The remote rejected the access token
    #[error("Authentication failed: {0}")]
    RemoteAuth(String),

    /// Error response from the remote API
    #[error("API error ({status}): {message}")]
    RemoteRequest { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Entities returned by a write are not in the mirror
    #[error("Mirror is missing {} updated record(s): {}", .entity_ids.len(), .entity_ids.join(", "))]
    Consistency { entity_ids: Vec<EntityId> },

    #[error("Mirror error: {0}")]
    LocalStore(#[from] StoreError),

    #[error("Engine error: {0}")]
    Engine(#[from] mirror_engine::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a remote request error from status and message
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::RemoteRequest {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Classify the error for the process exit status.
    pub fn severity(&self) -> Severity {
        match self {
            Self::RemoteAuth(_) | Self::Config(_) | Self::LocalStore(_) => Severity::Fatal,
            _ => Severity::Recoverable,
        }
    }
}
