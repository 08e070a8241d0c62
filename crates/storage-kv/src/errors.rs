//! Error types for the storage crate.

use platewise_core::KvError;
use thiserror::Error;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying key-value primitive failed
    #[error("key-value store error: {0}")]
    Kv(#[from] KvError),

    /// Stored value could not be (de)serialized
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
