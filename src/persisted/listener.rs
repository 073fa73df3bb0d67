use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::scope::{on_cleanup, CleanupHandle};
use crate::storage::{Backend, ChangeFeed, ListenerId};

#[derive(Default)]
struct Slot {
    registration: Option<(Arc<dyn Backend>, ListenerId)>,
    /// Entry in the enclosing scope, dropped from it on release.
    cleanup: Option<CleanupHandle>,
}

/// Shared, release-once handle on a change-feed registration.
///
/// Clones refer to the same registration, so whichever owner lets go first
/// (the store's last handle, `dispose`, or an enclosing scope) releases it
/// and the rest become no-ops.
#[derive(Clone)]
pub(crate) struct ListenerGuard {
    slot: Arc<Mutex<Slot>>,
}

impl ListenerGuard {
    pub(crate) fn new(backend: Arc<dyn Backend>, id: ListenerId) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                registration: Some((backend, id)),
                cleanup: None,
            })),
        }
    }

    pub(crate) fn inactive() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tie the registration to the innermost running scope, if any.
    ///
    /// The scope only holds a weak reference, and its entry is removed as soon
    /// as the registration is released some other way.
    pub(crate) fn attach_to_scope(&self) {
        let slot = Arc::downgrade(&self.slot);
        let handle = on_cleanup(move || {
            if let Some(slot) = slot.upgrade() {
                ListenerGuard { slot }.release();
            }
        });
        self.lock().cleanup = handle;
    }

    pub(crate) fn is_active(&self) -> bool {
        self.lock().registration.is_some()
    }

    /// Unregister from the change feed. Returns `false` if already released.
    pub(crate) fn release(&self) -> bool {
        let (taken, cleanup) = {
            let mut slot = self.lock();
            (slot.registration.take(), slot.cleanup.take())
        };
        if let Some(cleanup) = cleanup {
            cleanup.cancel();
        }
        match taken {
            Some((backend, id)) => {
                backend.unlisten(id);
                log::debug!("released {id}");
                true
            }
            None => false,
        }
    }
}
