//! Error types for `Toto` core library.

use thiserror::Error;

/// Result type alias using `Toto` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `Toto` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected before any write happened. The message is user-facing.
    #[error("{0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
