use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{ChangeFeed, ListenerId, StorageArea, StorageError, StorageEvent, StorageListener};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

struct Registration {
    id: ListenerId,
    context: usize,
    listener: StorageListener,
}

/// State shared by every context of one area.
struct Shared {
    items: RwLock<BTreeMap<String, String>>,
    listeners: RwLock<Vec<Registration>>,
    next_listener: AtomicU64,
    next_context: AtomicUsize,
    quota: Option<usize>,
}

/// An in-process storage area.
///
/// Every `MemoryStorage` is a handle for one context of a shared area.
/// [`MemoryStorage::context`] opens another context on the same area; a
/// mutation made through one context is reported to the listeners of all the
/// others. Cloning a handle stays in the same context.
///
/// ```
/// use keepsake::storage::{MemoryStorage, StorageArea};
///
/// let tab_a = MemoryStorage::new();
/// let tab_b = tab_a.context();
///
/// tab_a.set_item("theme", "\"dark\"").unwrap();
/// assert_eq!(tab_b.get_item("theme").unwrap().as_deref(), Some("\"dark\""));
/// ```
#[derive(Clone)]
pub struct MemoryStorage {
    shared: Arc<Shared>,
    context: usize,
}

impl MemoryStorage {
    /// Create an empty, unbounded area and return its first context.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create an empty area that holds at most `bytes` of keys and values.
    pub fn with_quota(bytes: usize) -> Self {
        Self::build(Some(bytes))
    }

    fn build(quota: Option<usize>) -> Self {
        Self {
            shared: Arc::new(Shared {
                items: RwLock::new(BTreeMap::new()),
                listeners: RwLock::new(Vec::new()),
                next_listener: AtomicU64::new(0),
                next_context: AtomicUsize::new(1),
                quota,
            }),
            context: 0,
        }
    }

    /// Open a new context on the same area.
    pub fn context(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            context: self.shared.next_context.fetch_add(1, Ordering::SeqCst),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        read(&self.shared.items).len()
    }

    /// Whether the area holds no entries.
    pub fn is_empty(&self) -> bool {
        read(&self.shared.items).is_empty()
    }

    /// Stored keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        read(&self.shared.items).keys().cloned().collect()
    }

    /// Number of listeners registered across all contexts.
    pub fn listener_count(&self) -> usize {
        read(&self.shared.listeners).len()
    }

    /// Deliver `event` to the listeners of every other context.
    fn dispatch(&self, event: StorageEvent) {
        let listeners: Vec<StorageListener> = read(&self.shared.listeners)
            .iter()
            .filter(|reg| reg.context != self.context)
            .map(|reg| Arc::clone(&reg.listener))
            .collect();
        for listener in listeners {
            listener(&event);
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageArea for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(read(&self.shared.items).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let old_value = {
            let mut items = write(&self.shared.items);
            let old_value = items.get(key).cloned();
            if old_value.as_deref() == Some(value) {
                return Ok(());
            }

            if let Some(limit) = self.shared.quota {
                let used: usize = items
                    .iter()
                    .filter(|(k, _)| k.as_str() != key)
                    .map(|(k, v)| k.len() + v.len())
                    .sum();
                if used + key.len() + value.len() > limit {
                    return Err(StorageError::QuotaExceeded {
                        key: key.to_string(),
                        limit,
                    });
                }
            }

            items.insert(key.to_string(), value.to_string());
            old_value
        };
        self.dispatch(StorageEvent::set(key, old_value, value));
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let removed = write(&self.shared.items).remove(key);
        if let Some(old_value) = removed {
            self.dispatch(StorageEvent::removed(key, Some(old_value)));
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let had_items = {
            let mut items = write(&self.shared.items);
            let had_items = !items.is_empty();
            items.clear();
            had_items
        };
        if had_items {
            self.dispatch(StorageEvent::cleared());
        }
        Ok(())
    }
}

impl ChangeFeed for MemoryStorage {
    fn listen(&self, listener: StorageListener) -> ListenerId {
        let id = ListenerId(self.shared.next_listener.fetch_add(1, Ordering::SeqCst));
        write(&self.shared.listeners).push(Registration {
            id,
            context: self.context,
            listener,
        });
        id
    }

    fn unlisten(&self, id: ListenerId) {
        write(&self.shared.listeners).retain(|reg| reg.id != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder(storage: &MemoryStorage) -> (ListenerId, Arc<Mutex<Vec<StorageEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let id = storage.listen(Arc::new(move |event: &StorageEvent| {
            sink.lock().unwrap().push(event.clone());
        }));
        (id, events)
    }

    #[test]
    fn contexts_share_entries() {
        let a = MemoryStorage::new();
        let b = a.context();

        a.set_item("k", "1").unwrap();
        assert_eq!(b.get_item("k").unwrap(), Some("1".to_string()));

        b.remove_item("k").unwrap();
        assert_eq!(a.get_item("k").unwrap(), None);
        assert!(a.is_empty());
    }

    #[test]
    fn own_writes_are_not_reported() {
        let a = MemoryStorage::new();
        let (_, events) = recorder(&a);

        a.set_item("k", "1").unwrap();
        a.clone().set_item("k", "2").unwrap();

        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn other_contexts_hear_each_change() {
        let a = MemoryStorage::new();
        let b = a.context();
        let (_, events) = recorder(&b);

        a.set_item("k", "1").unwrap();
        a.set_item("k", "2").unwrap();
        a.remove_item("k").unwrap();
        a.remove_item("k").unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                StorageEvent::set("k", None, "1"),
                StorageEvent::set("k", Some("1".into()), "2"),
                StorageEvent::removed("k", Some("2".into())),
            ]
        );
    }

    #[test]
    fn unchanged_value_emits_nothing() {
        let a = MemoryStorage::new();
        let b = a.context();
        let (_, events) = recorder(&b);

        a.set_item("k", "1").unwrap();
        a.set_item("k", "1").unwrap();

        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn clear_emits_single_keyless_event() {
        let a = MemoryStorage::new();
        let b = a.context();
        a.set_item("x", "1").unwrap();
        a.set_item("y", "2").unwrap();
        let (_, events) = recorder(&b);

        a.clear().unwrap();
        a.clear().unwrap();

        assert_eq!(*events.lock().unwrap(), vec![StorageEvent::cleared()]);
        assert!(b.is_empty());
    }

    #[test]
    fn unlisten_stops_delivery() {
        let a = MemoryStorage::new();
        let b = a.context();
        let (id, events) = recorder(&b);
        assert_eq!(a.listener_count(), 1);

        b.unlisten(id);
        a.set_item("k", "1").unwrap();

        assert!(events.lock().unwrap().is_empty());
        assert_eq!(a.listener_count(), 0);
    }

    #[test]
    fn quota_rejects_oversized_writes() {
        let a = MemoryStorage::with_quota(8);
        a.set_item("k", "1234").unwrap();

        let err = a.set_item("j", "12345").unwrap_err();
        assert_eq!(
            err,
            StorageError::QuotaExceeded {
                key: "j".into(),
                limit: 8
            }
        );
        assert_eq!(a.keys(), vec!["k".to_string()]);

        // Replacing an entry only counts the new value.
        a.set_item("k", "1234567").unwrap();
        assert_eq!(a.get_item("k").unwrap().as_deref(), Some("1234567"));
    }
}
