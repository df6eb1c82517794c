//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Entity not found.
    #[error("entity not found: {0}")]
    NotFound(String),

    /// Entity already exists under this key.
    #[error("entity already exists: {0}")]
    Conflict(String),

    /// A registered integrity handler refused the mutation.
    #[error("integrity violation on '{name}': {reason}")]
    IntegrityViolation { name: String, reason: String },

    /// Serialized value exceeds the configured size limit.
    #[error("value for '{key}' is {size} bytes, exceeding the {limit} byte limit")]
    ValueTooLarge {
        key: String,
        size: usize,
        limit: usize,
    },

    /// Configuration or bootstrap error. Fatal at construction time.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
