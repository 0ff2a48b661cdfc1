use std::sync::{Mutex, MutexGuard};

struct Slot<T> {
    state: T,
    disposed: bool,
}

/// Display state of one view plus its disposed flag, behind one lock.
///
/// Once disposed, `update` and `read` refuse to run, so a response that
/// lands after teardown cannot touch the view.
pub(crate) struct ViewCell<T> {
    slot: Mutex<Slot<T>>,
}

impl<T: Clone> ViewCell<T> {
    pub(crate) fn new(state: T) -> Self {
        Self {
            slot: Mutex::new(Slot {
                state,
                disposed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn snapshot(&self) -> T {
        self.lock().state.clone()
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let slot = self.lock();
        if slot.disposed {
            return None;
        }
        Some(f(&slot.state))
    }

    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut slot = self.lock();
        if slot.disposed {
            return None;
        }
        Some(f(&mut slot.state))
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    /// Returns `false` if the view was already disposed.
    pub(crate) fn dispose(&self) -> bool {
        let mut slot = self.lock();
        let first = !slot.disposed;
        slot.disposed = true;
        first
    }
}
