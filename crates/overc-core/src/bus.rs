use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::warn;

use crate::events::{DashboardEvent, EventKind};

type Handler = Arc<dyn Fn(&DashboardEvent) + Send + Sync>;

struct Registration {
    id: u64,
    kind: EventKind,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    entries: Mutex<Vec<Registration>>,
}

impl Registry {
    fn entries(&self) -> MutexGuard<'_, Vec<Registration>> {
        // Handlers never run under this lock, so a poisoned guard still
        // holds a consistent registry.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }
}

/// Session-wide publish/subscribe channel shared by every view controller.
///
/// Delivery is synchronous and in registration order. Each publish works on
/// a snapshot of the registry, so handlers may subscribe or unsubscribe
/// while being invoked. A panicking handler is logged and skipped; the
/// remaining handlers still receive the event.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&DashboardEvent) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.entries().push(Registration {
            id,
            kind,
            handler: Arc::new(handler),
        });
        Subscription {
            id,
            kind,
            registry: Arc::downgrade(&self.registry),
            active: true,
        }
    }

    /// Delivers `event` to every handler registered for its kind and returns
    /// how many were invoked.
    pub fn publish(&self, event: DashboardEvent) -> usize {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .registry
            .entries()
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| Arc::clone(&entry.handler))
            .collect();

        for handler in &handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                warn!(event = "bus_handler_panic", kind = %kind);
            }
        }
        handlers.len()
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.registry
            .entries()
            .iter()
            .filter(|entry| entry.kind == kind)
            .count()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.registry.entries().len())
            .finish()
    }
}

/// Disposer for one bus registration. Dropping it unsubscribes.
#[derive(Debug)]
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    kind: EventKind,
    registry: Weak<Registry>,
    active: bool,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Removes the handler. Safe to call any number of times, including
    /// from inside a handler and after the bus is gone.
    pub fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
