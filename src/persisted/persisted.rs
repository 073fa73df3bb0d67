use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::listener::ListenerGuard;
use super::PersistOptions;
use crate::error::{PersistError, Result};
use crate::shape::{decode, Serde, Shape};
use crate::storage::{Backend, ChangeFeed, StorageArea, StorageEvent, StorageListener};
use crate::store::{Store, Subscription};

struct Inner<T> {
    key: String,
    default: T,
    store: Store<T>,
    /// `None` when persistence is off.
    backend: Option<Arc<dyn Backend>>,
    listener: ListenerGuard,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        self.listener.release();
    }
}

/// A reactive store that survives restarts and follows other contexts.
///
/// On creation the stored value under `key` is read, validated against the
/// shape, and used as the initial value; anything missing or malformed falls
/// back to the default. Every `set`/`update` is written straight through to
/// the storage area. Changes made by other contexts sharing the area are
/// mirrored into this store without being written back.
///
/// Handles are cheap to clone and share one value. The cross-context listener
/// is released when the last handle is dropped, when [`dispose`] is called, or
/// when the [`Scope`](crate::scope::Scope) it was created in is disposed.
///
/// [`dispose`]: PersistedStore::dispose
pub struct PersistedStore<T> {
    inner: Arc<Inner<T>>,
}

impl<T> PersistedStore<T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    /// Create a store validated by deserializing into `T`.
    pub fn new(options: PersistOptions<T>, backend: Arc<dyn Backend>) -> Result<Self>
    where
        T: DeserializeOwned,
    {
        Self::with_shape(options, Serde::new(), backend)
    }

    /// Create a store validated by a custom shape.
    pub fn with_shape<S>(options: PersistOptions<T>, shape: S, backend: Arc<dyn Backend>) -> Result<Self>
    where
        S: Shape<T> + 'static,
    {
        let persistence = if options.persist {
            Some((backend, Arc::new(shape) as Arc<dyn Shape<T>>))
        } else {
            None
        };
        Self::build(options, persistence)
    }

    /// Create a store that never touches storage.
    pub fn in_memory(key: impl Into<String>, default: T) -> Result<Self> {
        Self::build(PersistOptions::new(key, default).persist(false), None)
    }

    fn build(
        options: PersistOptions<T>,
        persistence: Option<(Arc<dyn Backend>, Arc<dyn Shape<T>>)>,
    ) -> Result<Self> {
        let PersistOptions { key, default, .. } = options;
        if key.is_empty() {
            return Err(PersistError::EmptyKey);
        }

        let Some((backend, shape)) = persistence else {
            return Ok(Self {
                inner: Arc::new(Inner {
                    store: Store::new(default.clone()),
                    key,
                    default,
                    backend: None,
                    listener: ListenerGuard::inactive(),
                }),
            });
        };

        let initial = load(backend.as_ref(), &key, shape.as_ref(), &default);
        let store = Store::new(initial);

        let id = backend.listen(mirror(key.clone(), default.clone(), shape, store.clone()));
        log::debug!("`{key}` listening for external changes as {id}");
        let listener = ListenerGuard::new(Arc::clone(&backend), id);
        listener.attach_to_scope();

        Ok(Self {
            inner: Arc::new(Inner {
                key,
                default,
                store,
                backend: Some(backend),
                listener,
            }),
        })
    }

    /// Storage key this store lives under.
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// The configured default value.
    pub fn default_value(&self) -> &T {
        &self.inner.default
    }

    /// Whether this store reads from and writes to storage.
    pub fn is_persistent(&self) -> bool {
        self.inner.backend.is_some()
    }

    /// Whether external changes are still being followed.
    pub fn is_listening(&self) -> bool {
        self.inner.listener.is_active()
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.store.get()
    }

    /// Read the current value without cloning.
    ///
    /// `f` runs under the store's read lock: it must not call `set`,
    /// `update` or `clear` on this store.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.inner.store.read(f)
    }

    /// Subscribe to value changes.
    ///
    /// The callback runs immediately with the current value, then after every
    /// change, until the returned [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.inner.store.subscribe(callback)
    }

    /// Replace the value and write it through to storage.
    ///
    /// The value is not validated. It is stored before subscribers are
    /// notified, so a subscriber that writes back wins. Storage faults are
    /// returned after the in-memory value has already changed.
    pub fn set(&self, value: T) -> Result<()> {
        let raw = self.encode(&value)?;
        self.inner.store.set_then(value, || -> Result<()> {
            if let (Some(backend), Some(raw)) = (&self.inner.backend, raw) {
                backend.set_item(&self.inner.key, &raw)?;
                log::debug!("wrote `{}` ({} bytes)", self.inner.key, raw.len());
            }
            Ok(())
        })
    }

    /// Modify the value in place and write it through to storage.
    ///
    /// Equivalent to `set` with the modified current value.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut T),
    {
        let mut next = self.get();
        f(&mut next);
        self.set(next)
    }

    /// Reset to the default and remove the stored entry.
    pub fn clear(&self) -> Result<()> {
        self.inner.store.set_then(self.inner.default.clone(), || -> Result<()> {
            if let Some(backend) = &self.inner.backend {
                backend.remove_item(&self.inner.key)?;
                log::debug!("removed `{}`", self.inner.key);
            }
            Ok(())
        })
    }

    /// Stop following external changes. Local operations keep working.
    pub fn dispose(&self) {
        self.inner.listener.release();
    }

    fn encode(&self, value: &T) -> Result<Option<String>> {
        if self.inner.backend.is_none() {
            return Ok(None);
        }
        serde_json::to_string(value)
            .map(Some)
            .map_err(|source| PersistError::Encode {
                key: self.inner.key.clone(),
                source,
            })
    }
}

impl<T> Clone for PersistedStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Decode and validate `raw`, or fall back to `default`.
fn resolve<T: Clone>(key: &str, shape: &dyn Shape<T>, raw: &str, default: &T) -> T {
    match decode(shape, raw) {
        Ok(value) => value,
        Err(err) => {
            log::warn!("discarding stored value for `{key}`: {err}");
            default.clone()
        }
    }
}

fn load<T: Clone>(backend: &dyn Backend, key: &str, shape: &dyn Shape<T>, default: &T) -> T {
    match backend.get_item(key) {
        Ok(Some(raw)) => {
            log::debug!("loaded `{key}` from storage");
            resolve(key, shape, &raw, default)
        }
        Ok(None) => default.clone(),
        Err(err) => {
            log::warn!("could not read `{key}`, using default: {err}");
            default.clone()
        }
    }
}

/// Listener that mirrors external changes to `key` into `store`.
fn mirror<T>(key: String, default: T, shape: Arc<dyn Shape<T>>, store: Store<T>) -> StorageListener
where
    T: Clone + Send + Sync + 'static,
{
    Arc::new(move |event: &StorageEvent| {
        if !event.affects(&key) {
            return;
        }
        let next = match event.new_value.as_deref() {
            Some(raw) => resolve(&key, shape.as_ref(), raw, &default),
            None => {
                log::debug!("`{key}` removed externally, resetting to default");
                default.clone()
            }
        };
        store.set(next);
    })
}
