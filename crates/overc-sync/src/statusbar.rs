use overc_core::{DashboardEvent, EventBus, EventKind, StatusBarUpdate, Subscription};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

use crate::{current_runtime, SyncConfig, SyncError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusBarState {
    pub ajax_in_progress: bool,
    pub http_error: Option<String>,
    /// Unknown until the first status poll lands.
    pub supervisor_lag: Option<f64>,
}

impl StatusBarState {
    /// Merges the fields present in `update`. An empty error string clears
    /// the message.
    pub fn merge(&mut self, update: &StatusBarUpdate) {
        if let Some(in_progress) = update.ajax_in_progress {
            self.ajax_in_progress = in_progress;
        }
        if let Some(lag) = update.supervisor_lag {
            self.supervisor_lag = Some(lag);
        }
        if let Some(message) = &update.http_error {
            self.http_error = (!message.is_empty()).then(|| message.clone());
        }
    }
}

#[derive(Default)]
struct Inner {
    state: StatusBarState,
    /// Bumped on every error write; a clear timer only fires for its own.
    error_generation: u64,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Session-long listener for `StatusBar` events.
pub struct StatusBar {
    inner: Arc<Mutex<Inner>>,
    _subscription: Subscription,
}

impl StatusBar {
    pub fn attach(bus: &EventBus, config: &SyncConfig) -> Result<Self, SyncError> {
        let runtime = current_runtime()?;
        let ttl = config.http_error_ttl;
        let inner = Arc::new(Mutex::new(Inner::default()));

        let weak = Arc::downgrade(&inner);
        let subscription = bus.subscribe(EventKind::StatusBar, move |event| {
            if let DashboardEvent::StatusBar(update) = event {
                apply(&weak, &runtime, ttl, update);
            }
        });

        Ok(Self {
            inner,
            _subscription: subscription,
        })
    }

    pub fn snapshot(&self) -> StatusBarState {
        lock(&self.inner).state.clone()
    }
}

fn apply(inner: &Weak<Mutex<Inner>>, runtime: &Handle, ttl: Duration, update: &StatusBarUpdate) {
    let Some(strong) = inner.upgrade() else {
        return;
    };
    let mut guard = lock(&strong);
    guard.state.merge(update);
    if update.http_error.is_none() {
        return;
    }
    guard.error_generation += 1;
    if guard.state.http_error.is_none() {
        return;
    }

    let generation = guard.error_generation;
    let inner = inner.clone();
    runtime.spawn(async move {
        tokio::time::sleep(ttl).await;
        let Some(strong) = inner.upgrade() else {
            return;
        };
        let mut guard = lock(&strong);
        if guard.error_generation == generation {
            guard.state.http_error = None;
            debug!(event = "http_error_cleared", generation);
        }
    });
}

impl std::fmt::Debug for StatusBar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusBar")
            .field("state", &self.snapshot())
            .finish()
    }
}
