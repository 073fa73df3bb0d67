use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Cleanup = Box<dyn FnOnce() + Send>;

struct ScopeInner {
    cleanups: Mutex<Vec<(u64, Cleanup)>>,
    next_id: AtomicU64,
}

/// A registered cleanup that has not run yet.
///
/// Owners that finish before their scope call [`cancel`](Self::cancel) so the
/// scope does not keep their cleanup around.
pub struct CleanupHandle {
    scope: Weak<ScopeInner>,
    id: u64,
}

impl CleanupHandle {
    /// Remove the cleanup from its scope without running it.
    pub fn cancel(self) {
        if let Some(scope) = self.scope.upgrade() {
            scope
                .cleanups
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}

/// A lifetime boundary for reactive resources.
///
/// While a scope is running (see [`Scope::run`]) anything that needs teardown
/// registers it with [`on_cleanup`]. Disposing the scope, or dropping it, runs
/// every registered cleanup once, newest first.
///
/// # Examples
///
/// ```
/// use keepsake::scope::{on_cleanup, Scope};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// let released = Arc::new(AtomicBool::new(false));
/// let scope = Scope::new();
///
/// let flag = released.clone();
/// scope.run(|| {
///     on_cleanup(move || flag.store(true, Ordering::SeqCst));
/// });
///
/// assert!(!released.load(Ordering::SeqCst));
/// scope.dispose();
/// assert!(released.load(Ordering::SeqCst));
/// ```
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

// Thread-local stack of running scopes
thread_local! {
    static SCOPE_STACK: RefCell<Vec<Scope>> = const { RefCell::new(Vec::new()) };
}

impl Scope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                cleanups: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Run `f` with this scope as the current one.
    ///
    /// Scopes nest; cleanups register with the innermost. The scope is popped
    /// even if `f` panics.
    pub fn run<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        SCOPE_STACK.with(|stack| {
            stack.borrow_mut().push(self.clone());
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        SCOPE_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// The innermost running scope on this thread, if any.
    pub fn current() -> Option<Self> {
        SCOPE_STACK.with(|stack| stack.borrow().last().cloned())
    }

    /// Register a cleanup directly with this scope.
    pub fn add_cleanup<F>(&self, f: F) -> CleanupHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .cleanups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Box::new(f)));
        CleanupHandle {
            scope: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Number of cleanups waiting to run.
    pub fn pending(&self) -> usize {
        self.inner
            .cleanups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run all registered cleanups now.
    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

impl ScopeInner {
    fn dispose(&self) {
        let cleanups = std::mem::take(
            &mut *self.cleanups.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for (_, cleanup) in cleanups.into_iter().rev() {
            cleanup();
        }
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

/// Register `f` with the innermost running scope.
///
/// Returns `None` (and drops `f` unrun) when no scope is running.
pub fn on_cleanup<F>(f: F) -> Option<CleanupHandle>
where
    F: FnOnce() + Send + 'static,
{
    Scope::current().map(|scope| scope.add_cleanup(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn no_scope_outside_run() {
        assert!(Scope::current().is_none());
        assert!(on_cleanup(|| {}).is_none());
    }

    #[test]
    fn cleanups_run_newest_first_and_once() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let scope = Scope::new();

        scope.run(|| {
            for i in 0..3 {
                let order = order.clone();
                assert!(on_cleanup(move || order.lock().unwrap().push(i)).is_some());
            }
        });
        assert_eq!(scope.pending(), 3);

        scope.dispose();
        scope.dispose();

        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
        assert_eq!(scope.pending(), 0);
    }

    #[test]
    fn nested_scopes_register_with_innermost() {
        let outer = Scope::new();
        let inner = Scope::new();

        outer.run(|| {
            inner.run(|| {
                on_cleanup(|| {});
            });
            on_cleanup(|| {});
            on_cleanup(|| {});
        });

        assert_eq!(inner.pending(), 1);
        assert_eq!(outer.pending(), 2);
        assert!(Scope::current().is_none());
    }

    #[test]
    fn dropping_last_handle_runs_cleanups() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let scope = Scope::new();
            let counter = counter.clone();
            let _ = scope.add_cleanup(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancelled_cleanup_is_removed_unrun() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scope = Scope::new();

        let kept = counter.clone();
        let _ = scope.add_cleanup(move || {
            kept.fetch_add(1, Ordering::SeqCst);
        });
        let dropped = counter.clone();
        let handle = scope.add_cleanup(move || {
            dropped.fetch_add(10, Ordering::SeqCst);
        });
        assert_eq!(scope.pending(), 2);

        handle.cancel();
        assert_eq!(scope.pending(), 1);

        scope.dispose();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_after_scope_is_gone_is_harmless() {
        let handle = Scope::new().add_cleanup(|| {});
        handle.cancel();
    }

    #[test]
    fn scope_is_popped_after_panic() {
        let scope = Scope::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            scope.run(|| panic!("boom"));
        }));

        assert!(result.is_err());
        assert!(Scope::current().is_none());
    }
}
