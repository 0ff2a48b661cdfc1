use chrono::{DateTime, Utc};
use overc_client::{ClientError, StatusApi};
use overc_core::{AlertRecord, EventBus, EventKind, LookbackWindow, Scope, Subscription};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::debounce::Debouncer;
use crate::view::ViewCell;
use crate::{current_runtime, SyncConfig, SyncError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertHistory {
    pub window: LookbackWindow,
    pub alerts: Vec<AlertRecord>,
    pub last_updated: Option<DateTime<Utc>>,
}

struct Shared<A> {
    api: Arc<A>,
    scope: Scope,
    runtime: Handle,
    view: ViewCell<AlertHistory>,
}

impl<A: StatusApi> Shared<A> {
    fn fetch(self: &Arc<Self>) {
        let Some(hours) = self.view.read(|history| history.window.hours()) else {
            return;
        };
        let shared = Arc::clone(self);
        self.runtime.spawn(async move {
            let result = shared.api.fetch_alerts(&shared.scope, hours).await;
            shared.apply(result);
        });
    }

    fn apply(&self, result: Result<Vec<AlertRecord>, ClientError>) {
        let alerts = match result {
            Ok(alerts) => alerts,
            Err(error) => {
                warn!(event = "alert_history_fetch_failed", scope = %self.scope, error = %error);
                return;
            }
        };
        let count = alerts.len();
        let applied = self.view.update(move |history| {
            history.alerts = alerts;
            history.last_updated = Some(Utc::now());
        });
        match applied {
            Some(()) => debug!(event = "alert_history_loaded", scope = %self.scope, count),
            None => debug!(event = "alert_history_discarded", scope = %self.scope),
        }
    }
}

/// Alerts raised within the lookback window for any scope.
pub struct AlertHistoryController<A> {
    shared: Arc<Shared<A>>,
    debouncer: Arc<Debouncer>,
    subscription: Option<Subscription>,
    step_hours: u32,
}

impl<A: StatusApi> AlertHistoryController<A> {
    pub fn new(
        api: Arc<A>,
        bus: EventBus,
        scope: Scope,
        config: &SyncConfig,
    ) -> Result<Self, SyncError> {
        let runtime = current_runtime()?;
        let shared = Arc::new(Shared {
            api,
            scope,
            runtime: runtime.clone(),
            view: ViewCell::new(AlertHistory {
                window: LookbackWindow::new(config.lookback_hours),
                ..AlertHistory::default()
            }),
        });

        let weak = Arc::downgrade(&shared);
        let debouncer = Arc::new(Debouncer::new(&runtime, config.debounce, move || {
            if let Some(shared) = weak.upgrade() {
                shared.fetch();
            }
        }));

        let weak = Arc::downgrade(&debouncer);
        let subscription = bus.subscribe(EventKind::UpdateAlerts, move |_| {
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

    pub fn snapshot(&self) -> AlertHistory {
        self.shared.view.snapshot()
    }

    pub fn refresh(&self) {
        self.shared.fetch();
    }

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

impl<A> Drop for AlertHistoryController<A> {
    fn drop(&mut self) {
        self.shared.view.dispose();
        self.debouncer.cancel();
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}
