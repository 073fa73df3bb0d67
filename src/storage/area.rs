use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::StorageEvent;

/// Faults raised by a storage area.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The write would take the area past its capacity.
    #[error("storage quota exceeded writing `{key}` (limit {limit} bytes)")]
    QuotaExceeded {
        /// Key being written.
        key: String,
        /// Configured capacity in bytes.
        limit: usize,
    },

    /// The area cannot be used right now.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A synchronous key-value storage area.
pub trait StorageArea: Send + Sync {
    /// Raw value stored under `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every entry.
    fn clear(&self) -> Result<(), StorageError>;
}

/// Callback invoked for every change made by another context.
pub type StorageListener = Arc<dyn Fn(&StorageEvent) + Send + Sync>;

/// Handle identifying a registered [`StorageListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Cross-context change notifications for a storage area.
///
/// Listeners only hear about mutations performed through other contexts,
/// never about the registering context's own writes.
pub trait ChangeFeed: Send + Sync {
    /// Register a listener.
    fn listen(&self, listener: StorageListener) -> ListenerId;

    /// Release a listener. Unknown ids are ignored.
    fn unlisten(&self, id: ListenerId);
}

/// A storage area together with its change feed.
pub trait Backend: StorageArea + ChangeFeed {}

impl<B: StorageArea + ChangeFeed + ?Sized> Backend for B {}
