use chrono::{DateTime, Utc};
use overc_client::{ClientError, ItemApi, StatusApi};
use overc_core::{
    DashboardEvent, EventBus, EventKind, Scope, ServerSummary, Stats, StatsChange, StatusBarUpdate,
    StatusSnapshot, Subscription,
};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::poll::PollScheduler;
use crate::view::ViewCell;
use crate::{current_runtime, SyncConfig, SyncError};

/// Display state of the overview pane.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverviewState {
    pub servers: Vec<ServerSummary>,
    pub stats: Stats,
    /// Wall-clock time of the last applied poll.
    pub last_updated: Option<DateTime<Utc>>,
}

impl OverviewState {
    /// Title of the first service listed, used as the page title when the
    /// view is bound to a single service.
    pub fn service_title(&self) -> Option<&str> {
        self.servers
            .iter()
            .flat_map(|server| server.services.iter())
            .map(|service| service.display_name())
            .next()
    }

    pub fn service_count(&self) -> usize {
        self.servers.iter().map(|server| server.services.len()).sum()
    }
}

struct Shared<A> {
    api: Arc<A>,
    bus: EventBus,
    scope: Scope,
    runtime: Handle,
    view: ViewCell<OverviewState>,
}

impl<A: StatusApi> Shared<A> {
    fn refresh(self: &Arc<Self>) {
        if self.view.is_disposed() {
            return;
        }
        let shared = Arc::clone(self);
        self.runtime.spawn(async move {
            let result = shared.api.fetch_status(&shared.scope).await;
            shared.apply(result);
        });
    }

    fn apply(&self, result: Result<StatusSnapshot, ClientError>) {
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(event = "overview_poll_failed", scope = %self.scope, error = %error);
                return;
            }
        };
        let lag = snapshot.stats.supervisor_lag;
        let applied = self.view.update(move |state| {
            let change = StatsChange::between(&state.stats, &snapshot.stats);
            state.servers = snapshot.servers;
            state.stats = snapshot.stats;
            state.last_updated = Some(Utc::now());
            change
        });
        let Some(change) = applied else {
            debug!(event = "overview_response_discarded", scope = %self.scope);
            return;
        };

        self.bus
            .publish(DashboardEvent::StatusBar(StatusBarUpdate::supervisor_lag(lag)));
        for event in change.cascade() {
            self.bus.publish(event);
        }
    }

    fn after_delete(&self, item: &str, id: &str, result: &Result<(), ClientError>) {
        match result {
            Ok(()) => {
                info!(event = "item_deleted", item, id);
                self.bus.publish(DashboardEvent::UpdateServices);
            }
            Err(error) => {
                warn!(event = "item_delete_failed", item, id, error = %error);
            }
        }
    }
}

/// Polls the status endpoint for its scope and fans stats changes out to
/// the history views.
pub struct OverviewController<A> {
    shared: Arc<Shared<A>>,
    poller: Option<PollScheduler>,
    subscription: Option<Subscription>,
}

impl<A: StatusApi> OverviewController<A> {
    pub fn new(
        api: Arc<A>,
        bus: EventBus,
        scope: Scope,
        config: &SyncConfig,
    ) -> Result<Self, SyncError> {
        let runtime = current_runtime()?;
        let shared = Arc::new(Shared {
            api,
            bus: bus.clone(),
            scope,
            runtime: runtime.clone(),
            view: ViewCell::new(OverviewState::default()),
        });

        let weak = Arc::downgrade(&shared);
        let subscription = bus.subscribe(EventKind::UpdateServices, move |_| {
            if let Some(shared) = weak.upgrade() {
                shared.refresh();
            }
        });

        let weak = Arc::downgrade(&shared);
        let poller = PollScheduler::start(&runtime, config.poll_interval, move || {
            if let Some(shared) = weak.upgrade() {
                shared.refresh();
            }
        });

        Ok(Self {
            shared,
            poller: Some(poller),
            subscription: Some(subscription),
        })
    }

    pub fn scope(&self) -> &Scope {
        &self.shared.scope
    }

    pub fn snapshot(&self) -> OverviewState {
        self.shared.view.snapshot()
    }

    /// Fetches now, outside the poll cycle.
    pub fn refresh(&self) {
        self.shared.refresh();
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.view.is_disposed()
    }

    /// Stops polling and leaves the bus. Responses still in flight are
    /// dropped when they land.
    pub fn dispose(&mut self) {
        if self.shared.view.dispose() {
            debug!(event = "overview_disposed", scope = %self.shared.scope);
        }
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl<A: StatusApi + ItemApi> OverviewController<A> {
    /// Deletes a server; a success makes every overview refetch.
    pub fn delete_server(
        &self,
        server_id: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send + 'static {
        let shared = Arc::clone(&self.shared);
        let server_id = server_id.to_string();
        async move {
            let result = shared.api.delete_server(&server_id).await;
            shared.after_delete("server", &server_id, &result);
            result
        }
    }

    pub fn delete_service(
        &self,
        service_id: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send + 'static {
        let shared = Arc::clone(&self.shared);
        let service_id = service_id.to_string();
        async move {
            let result = shared.api.delete_service(&service_id).await;
            shared.after_delete("service", &service_id, &result);
            result
        }
    }
}

impl<A> Drop for OverviewController<A> {
    fn drop(&mut self) {
        self.shared.view.dispose();
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}
