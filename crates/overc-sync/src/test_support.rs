use overc_client::{ClientError, ItemApi, StatusApi};
use overc_core::{
    AlertRecord, DashboardEvent, EventBus, EventKind, Scope, StateRecord, StatesQuery, Stats,
    StatusSnapshot, Subscription,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Scripted in-memory backend.
pub(crate) struct FakeApi {
    status_script: Mutex<VecDeque<Result<StatusSnapshot, ClientError>>>,
    steady_status: Mutex<StatusSnapshot>,
    pub(crate) status_calls: AtomicUsize,
    pub(crate) states: Mutex<Vec<StateRecord>>,
    pub(crate) states_calls: Mutex<Vec<(String, StatesQuery)>>,
    pub(crate) alerts: Mutex<Vec<AlertRecord>>,
    pub(crate) alerts_calls: Mutex<Vec<(Scope, u32)>>,
    pub(crate) deleted: Mutex<Vec<String>>,
    pub(crate) fail_deletes: AtomicBool,
    gated: AtomicBool,
    gate: Semaphore,
}

impl FakeApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            status_script: Mutex::new(VecDeque::new()),
            steady_status: Mutex::new(StatusSnapshot::default()),
            status_calls: AtomicUsize::new(0),
            states: Mutex::new(Vec::new()),
            states_calls: Mutex::new(Vec::new()),
            alerts: Mutex::new(Vec::new()),
            alerts_calls: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            fail_deletes: AtomicBool::new(false),
            gated: AtomicBool::new(false),
            gate: Semaphore::new(0),
        })
    }

    pub(crate) fn push_status(&self, result: Result<StatusSnapshot, ClientError>) {
        self.status_script.lock().expect("script lock").push_back(result);
    }

    /// Holds every response until `release` hands out a permit.
    pub(crate) fn hold_responses(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    pub(crate) fn release(&self, responses: usize) {
        self.gate.add_permits(responses);
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    async fn wait_for_gate(&self) {
        if self.gated.load(Ordering::SeqCst) {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }
    }
}

impl StatusApi for FakeApi {
    async fn fetch_status(&self, _scope: &Scope) -> Result<StatusSnapshot, ClientError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.status_script.lock().expect("script lock").pop_front();
        self.wait_for_gate().await;
        match scripted {
            Some(Ok(snapshot)) => {
                *self.steady_status.lock().expect("steady lock") = snapshot.clone();
                Ok(snapshot)
            }
            Some(Err(error)) => Err(error),
            None => Ok(self.steady_status.lock().expect("steady lock").clone()),
        }
    }

    async fn fetch_states(
        &self,
        service_id: &str,
        query: &StatesQuery,
    ) -> Result<Vec<StateRecord>, ClientError> {
        self.states_calls
            .lock()
            .expect("states calls lock")
            .push((service_id.to_string(), query.clone()));
        self.wait_for_gate().await;
        Ok(self.states.lock().expect("states lock").clone())
    }

    async fn fetch_alerts(&self, scope: &Scope, hours: u32) -> Result<Vec<AlertRecord>, ClientError> {
        self.alerts_calls
            .lock()
            .expect("alerts calls lock")
            .push((scope.clone(), hours));
        self.wait_for_gate().await;
        Ok(self.alerts.lock().expect("alerts lock").clone())
    }
}

impl ItemApi for FakeApi {
    async fn delete_server(&self, server_id: &str) -> Result<(), ClientError> {
        self.delete(format!("server/{server_id}"))
    }

    async fn delete_service(&self, service_id: &str) -> Result<(), ClientError> {
        self.delete(format!("service/{service_id}"))
    }
}

impl FakeApi {
    fn delete(&self, item: String) -> Result<(), ClientError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ClientError::Status {
                method: "DELETE".to_string(),
                url: format!("http://fake/api/item/{item}"),
                status: 500,
                reason: "Internal Server Error".to_string(),
            });
        }
        self.deleted.lock().expect("deleted lock").push(item);
        Ok(())
    }
}

pub(crate) fn snapshot(n_alerts: u64, last_state_id: Option<u64>) -> StatusSnapshot {
    StatusSnapshot {
        servers: Vec::new(),
        stats: Stats {
            n_alerts,
            last_state_id,
            supervisor_lag: 1.0,
        },
    }
}

pub(crate) fn transport_error() -> ClientError {
    ClientError::Transport {
        method: "GET".to_string(),
        url: "http://fake/api/status/".to_string(),
        message: "connection refused".to_string(),
    }
}

/// Records the kinds of every event published on the bus.
pub(crate) fn record_events(bus: &EventBus) -> (Arc<Mutex<Vec<DashboardEvent>>>, Vec<Subscription>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let subscriptions = EventKind::ALL
        .iter()
        .map(|kind| {
            let sink = Arc::clone(&seen);
            bus.subscribe(*kind, move |event| {
                sink.lock().expect("events lock").push(event.clone());
            })
        })
        .collect();
    (seen, subscriptions)
}

pub(crate) fn count_of(events: &Mutex<Vec<DashboardEvent>>, kind: EventKind) -> usize {
    events
        .lock()
        .expect("events lock")
        .iter()
        .filter(|event| event.kind() == kind)
        .count()
}

/// Lets spawned work run to completion on the paused test clock.
pub(crate) async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
