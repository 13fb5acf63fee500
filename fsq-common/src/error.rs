//! Common error types for FSQ services

use thiserror::Error;

/// Common result type for FSQ operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across FSQ services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding of stored columns failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found within the calling tenant
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Uniqueness violation (e.g. duplicate lot number)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Operation not allowed in the resource's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Record changed since it was read (optimistic concurrency check failed)
    #[error("Stale version: {0}")]
    StaleVersion(String),

    /// Operation exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors the caller can resolve by correcting the request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::InvalidInput(_)
                | Error::Conflict(_)
                | Error::InvalidState(_)
        )
    }
}
