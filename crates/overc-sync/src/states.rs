use chrono::{DateTime, Utc};
use overc_client::{ClientError, StatusApi};
use overc_core::{
    EventBus, EventKind, ExpandedGroups, LookbackWindow, Scope, StateRecord, StatesQuery,
    Subscription,
};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::debounce::Debouncer;
use crate::view::ViewCell;
use crate::{current_runtime, SyncConfig, SyncError};

/// Display state of the state history pane.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateHistory {
    pub window: LookbackWindow,
    pub expanded: ExpandedGroups,
    /// Newest first, nested alerts annotated with their presentation class.
    pub states: Vec<StateRecord>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl StateHistory {
    fn new(hours: u32) -> Self {
        Self {
            window: LookbackWindow::new(hours),
            ..Self::default()
        }
    }

    /// Group key of the newest record that is still collapsed.
    pub fn next_collapsed_group(&self) -> Option<&str> {
        self.states
            .iter()
            .filter_map(|record| record.group.as_deref())
            .find(|group| !self.expanded.contains(group))
    }
}

struct Shared<A> {
    api: Arc<A>,
    scope: Scope,
    service_id: String,
    runtime: Handle,
    view: ViewCell<StateHistory>,
}

impl<A: StatusApi> Shared<A> {
    fn fetch(self: &Arc<Self>) {
        let Some(query) = self
            .view
            .read(|history| StatesQuery::grouped(&history.window, &history.expanded))
        else {
            return;
        };
        let shared = Arc::clone(self);
        self.runtime.spawn(async move {
            let result = shared.api.fetch_states(&shared.service_id, &query).await;
            shared.apply(result);
        });
    }

    fn apply(&self, result: Result<Vec<StateRecord>, ClientError>) {
        let mut states = match result {
            Ok(states) => states,
            Err(error) => {
                warn!(
                    event = "state_history_fetch_failed",
                    service_id = %self.service_id,
                    error = %error
                );
                return;
            }
        };
        states.iter_mut().for_each(StateRecord::annotate);
        let count = states.len();
        let applied = self.view.update(move |history| {
            history.states = states;
            history.last_updated = Some(Utc::now());
        });
        match applied {
            Some(()) => debug!(event = "state_history_loaded", service_id = %self.service_id, count),
            None => debug!(event = "state_history_discarded", service_id = %self.service_id),
        }
    }
}

/// State transitions of one service, refetched on debounced
/// `UpdateStates` signals and on user-driven window or group changes.
pub struct StateHistoryController<A> {
    shared: Arc<Shared<A>>,
    debouncer: Arc<Debouncer>,
    subscription: Option<Subscription>,
    step_hours: u32,
}

impl<A: StatusApi> StateHistoryController<A> {
    pub fn new(
        api: Arc<A>,
        bus: EventBus,
        scope: Scope,
        config: &SyncConfig,
    ) -> Result<Self, SyncError> {
        let Some(service_id) = scope.service_id().map(str::to_string) else {
            return Err(SyncError::ScopeMismatch {
                view: "state history",
                expected: "service",
                found: scope.to_string(),
            });
        };
        let runtime = current_runtime()?;
        let shared = Arc::new(Shared {
            api,
            scope,
            service_id,
            runtime: runtime.clone(),
            view: ViewCell::new(StateHistory::new(config.lookback_hours)),
        });

        let weak = Arc::downgrade(&shared);
        let debouncer = Arc::new(Debouncer::new(&runtime, config.debounce, move || {
            if let Some(shared) = weak.upgrade() {
                shared.fetch();
            }
        }));

        let weak = Arc::downgrade(&debouncer);
        let subscription = bus.subscribe(EventKind::UpdateStates, move |_| {
            if let Some(debouncer) = weak.upgrade() {
                debouncer.signal();
            }
        });

        Ok(Self {
            shared,
            debouncer,
            subscription: Some(subscription),
            step_hours: config.lookback_step_hours,
        })
    }

    pub fn scope(&self) -> &Scope {
        &self.shared.scope
    }

    pub fn snapshot(&self) -> StateHistory {
        self.shared.view.snapshot()
    }

    pub fn refresh(&self) {
        self.shared.fetch();
    }

    /// Grows the lookback window by `hours`; refetches only if it changed.
    pub fn extend_window(&self, hours: u32) -> bool {
        let changed = self
            .shared
            .view
            .update(|history| history.window.extend(hours))
            .unwrap_or(false);
        if changed {
            self.shared.fetch();
        }
        changed
    }

    pub fn load_more(&self) -> bool {
        self.extend_window(self.step_hours)
    }

    /// Asks the backend to expand `group`; refetches only for a new key.
    pub fn expand_group(&self, group: &str) -> bool {
        let added = self
            .shared
            .view
            .update(|history| history.expanded.insert(group))
            .unwrap_or(false);
        if added {
            self.shared.fetch();
        }
        added
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.view.is_disposed()
    }

    pub fn dispose(&mut self) {
        self.shared.view.dispose();
        self.debouncer.cancel();
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl<A> Drop for StateHistoryController<A> {
    fn drop(&mut self) {
        self.shared.view.dispose();
        self.debouncer.cancel();
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}
