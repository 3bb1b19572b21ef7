//! Storage error types.

use thiserror::Error;

/// Errors produced by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists under the requested key.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The approval already holds a terminal status.
    #[error("approval {id} was already resolved as {status}")]
    AlreadyResolved {
        /// Approval id.
        id: String,
        /// The terminal status it already holds.
        status: String,
    },

    /// Record (de)serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A namespace or key is empty or contains reserved bytes.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The backing store could not be opened.
    #[error("storage connection failed: {0}")]
    Connection(String),

    /// Unexpected backend failure.
    #[error("internal storage error: {0}")]
    Internal(String),
}

/// Convenience alias for fallible store operations.
pub type StoreResult<T> = Result<T, StoreError>;
