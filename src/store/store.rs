use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;
type Subscribers<T> = RwLock<Vec<(usize, Subscriber<T>)>>;

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Values waiting to be delivered, oldest first.
struct Pending<T> {
    queue: VecDeque<T>,
    notifying: bool,
}

/// Clears the `notifying` flag even if a subscriber panics.
struct DrainGuard<'a, T> {
    pending: &'a Mutex<Pending<T>>,
}

impl<T> Drop for DrainGuard<'_, T> {
    fn drop(&mut self) {
        let mut pending = lock(self.pending);
        pending.notifying = false;
        pending.queue.clear();
    }
}

/// A thread-safe reactive container.
///
/// Every change is delivered synchronously to all subscribers, in the order
/// the changes were applied. A change made from inside a subscriber is queued
/// and delivered once the current round of notifications has finished, so
/// every subscriber sees the same sequence and ends on the current value.
pub struct Store<T> {
    state: Arc<RwLock<T>>,
    subscribers: Arc<Subscribers<T>>,
    pending: Arc<Mutex<Pending<T>>>,
    next_id: Arc<AtomicUsize>,
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    /// Create a new store with the given initial state.
    pub fn new(initial: T) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial)),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            pending: Arc::new(Mutex::new(Pending {
                queue: VecDeque::new(),
                notifying: false,
            })),
            next_id: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get a clone of the current state.
    pub fn get(&self) -> T {
        read(&self.state).clone()
    }

    /// Read state without cloning it.
    ///
    /// `f` runs under the store's read lock: it must not call `set` or
    /// `update` on the same store. Use [`get`](Self::get) for that.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let state = read(&self.state);
        f(&*state)
    }

    /// Set a new state value.
    pub fn set(&self, new_state: T) {
        self.set_then(new_state, || ());
    }

    /// Set a new state value and run `f` before subscribers are notified.
    pub(crate) fn set_then<F, R>(&self, new_state: T, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        *write(&self.state) = new_state.clone();
        let result = f();
        self.notify(new_state);
        result
    }

    /// Update the state in place.
    ///
    /// `f` runs on a copy of the current state with no lock held, so it may
    /// read the store.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        let mut next = self.get();
        f(&mut next);
        self.set(next);
    }

    /// Subscribe to state changes.
    ///
    /// The callback is called immediately with the current state and then on
    /// every change until the returned [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let callback: Subscriber<T> = Arc::new(callback);
        write(&self.subscribers).push((id, Arc::clone(&callback)));

        let current = self.get();
        callback(&current);

        let subscribers: Weak<Subscribers<T>> = Arc::downgrade(&self.subscribers);
        Subscription::new(move || {
            if let Some(subscribers) = subscribers.upgrade() {
                write(&subscribers).retain(|(sub_id, _)| *sub_id != id);
            }
        })
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        read(&self.subscribers).len()
    }

    /// Queue `value` for delivery and, unless a delivery round is already
    /// running further up the stack, drain the queue.
    ///
    /// Locks are released before callbacks run so a subscriber may read or
    /// write the store, or drop its own subscription.
    fn notify(&self, value: T) {
        {
            let mut pending = lock(&self.pending);
            pending.queue.push_back(value);
            if pending.notifying {
                return;
            }
            pending.notifying = true;
        }
        let _guard = DrainGuard {
            pending: &self.pending,
        };

        loop {
            let Some(value) = lock(&self.pending).queue.pop_front() else {
                break;
            };
            let subscribers: Vec<Subscriber<T>> = read(&self.subscribers)
                .iter()
                .map(|(_, sub)| Arc::clone(sub))
                .collect();
            for subscriber in subscribers {
                subscriber(&value);
            }
        }
    }
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            subscribers: Arc::clone(&self.subscribers),
            pending: Arc::clone(&self.pending),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

/// RAII guard for a store subscriber. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop receiving updates.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    /// Keep the subscriber alive for as long as the store lives.
    pub fn forget(mut self) {
        self.cancel = None;
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}
