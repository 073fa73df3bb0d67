//! Stores that persist to a storage area and follow other contexts.
//!
//! ```
//! use keepsake::storage::{MemoryStorage, StorageArea};
//! use keepsake::{PersistOptions, PersistedStore};
//! use std::sync::Arc;
//!
//! let tab = MemoryStorage::new();
//! let count = PersistedStore::new(PersistOptions::new("count", 0u32), Arc::new(tab.clone())).unwrap();
//!
//! count.update(|n| *n += 1).unwrap();
//! assert_eq!(tab.get_item("count").unwrap().as_deref(), Some("1"));
//!
//! // A later session picks the value back up.
//! let reopened = PersistedStore::new(PersistOptions::new("count", 0u32), Arc::new(tab)).unwrap();
//! assert_eq!(reopened.get(), 1);
//! ```

mod listener;
mod options;
mod persisted;

pub use options::PersistOptions;
pub use persisted::PersistedStore;
