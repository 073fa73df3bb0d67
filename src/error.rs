//! Errors surfaced to callers of a persisted store.
//!
//! Only faults the caller can act on show up here. Missing or malformed
//! stored data never does; it is replaced by the store's default.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned by [`PersistedStore`](crate::PersistedStore) operations.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The storage key was empty.
    #[error("storage key must not be empty")]
    EmptyKey,

    /// The storage area refused a write or removal.
    #[error("storage write failed: {0}")]
    Storage(#[from] StorageError),

    /// The value could not be encoded as JSON.
    #[error("failed to encode value for `{key}`: {source}")]
    Encode {
        /// Key the value was destined for.
        key: String,
        /// Underlying serializer error.
        source: serde_json::Error,
    },
}

/// Result type for persisted store operations.
pub type Result<T> = std::result::Result<T, PersistError>;
