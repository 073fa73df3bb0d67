//! # Keepsake
//!
//! Reactive stores that survive restarts and stay in sync across contexts.
//!
//! A [`PersistedStore`] is an observable value backed by one key in a
//! key-value storage area:
//!
//! - The stored value is read and validated when the store is created;
//!   missing or malformed data falls back to a default.
//! - Every `set`/`update` is written straight through to storage.
//! - Changes made by other contexts sharing the area (other tabs, other
//!   windows) are mirrored into the store.
//!
//! ## Building blocks
//!
//! - [`store`] - the reactive container: `get`, `set`, `update`, `subscribe`
//! - [`shape`] - validation of values read back from storage
//! - [`storage`] - storage areas, change feeds, and an in-memory area
//! - [`scope`] - scoped teardown for listener registrations
//!
//! ## Example
//!
//! ```
//! use keepsake::storage::MemoryStorage;
//! use keepsake::{PersistOptions, PersistedStore};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
//! struct Prefs {
//!     theme: String,
//!     font_size: u8,
//! }
//!
//! let tab = MemoryStorage::new();
//! let default = Prefs { theme: "light".into(), font_size: 14 };
//! let prefs = PersistedStore::new(PersistOptions::new("prefs", default), Arc::new(tab.clone()))?;
//!
//! prefs.update(|p| p.theme = "dark".into())?;
//!
//! // Another tab on the same storage sees the change.
//! let other = tab.context();
//! let default = Prefs { theme: "light".into(), font_size: 14 };
//! let mirror = PersistedStore::new(PersistOptions::new("prefs", default), Arc::new(other))?;
//! assert_eq!(mirror.get().theme, "dark");
//! # Ok::<(), keepsake::PersistError>(())
//! ```

pub mod error;
pub mod persisted;
pub mod scope;
pub mod shape;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use error::{PersistError, Result};
pub use persisted::{PersistOptions, PersistedStore};
pub use scope::Scope;
pub use shape::{Serde, Shape, ShapeExt};
pub use storage::{Backend, MemoryStorage, StorageArea};
pub use store::{Store, Subscription};
