//! Key-value storage areas and their cross-context change feeds.
//!
//! A storage area is shared by several execution contexts (think browser tabs
//! on one origin). Each context sees the same entries, and learns about
//! mutations made by the *other* contexts through a [`ChangeFeed`].
//!
//! - [`StorageArea`] — synchronous `get_item`/`set_item`/`remove_item`/`clear`.
//! - [`ChangeFeed`] — register and release listeners for [`StorageEvent`]s.
//! - [`Backend`] — both of the above, the shape a persisted store consumes.
//! - [`MemoryStorage`] — an in-process area with per-context handles.

mod area;
mod event;
mod memory;

pub use area::{Backend, ChangeFeed, ListenerId, StorageArea, StorageError, StorageListener};
pub use event::StorageEvent;
pub use memory::MemoryStorage;
