use serde::{Deserialize, Deserializer, Serialize};

use crate::events::DashboardEvent;
use crate::{deserialize_id, deserialize_opt_id, PresentationClass, Severity};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub servers: Vec<ServerSummary>,
    #[serde(default)]
    pub stats: Stats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSummary {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub services: Vec<ServiceSummary>,
}

impl ServerSummary {
    pub fn display_name(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSummary {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    /// Expected reporting period, seconds.
    #[serde(default)]
    pub period: Option<u64>,
    #[serde(default)]
    pub state: Option<ServiceState>,
}

impl ServiceSummary {
    /// Last known severity; `Unknown` until the service has reported.
    pub fn severity(&self) -> Severity {
        self.state
            .as_ref()
            .map(|state| state.state.clone())
            .unwrap_or_default()
    }

    pub fn display_name(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceState {
    #[serde(default)]
    pub rtime: String,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub seen_ago: String,
    #[serde(default)]
    pub state: Severity,
    #[serde(default)]
    pub info: String,
}

/// Aggregate counters returned with every status fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Alerts observed in the current lookback window.
    #[serde(default)]
    pub n_alerts: u64,
    /// Identifier of the newest state transition known to the backend.
    #[serde(default)]
    pub last_state_id: Option<u64>,
    /// Seconds since the backend's supervisor loop last ran.
    #[serde(default, deserialize_with = "deserialize_lag")]
    pub supervisor_lag: f64,
}

/// Which dependent views a new [`Stats`] snapshot invalidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsChange {
    pub alerts_changed: bool,
    pub states_changed: bool,
}

impl StatsChange {
    pub fn between(previous: &Stats, next: &Stats) -> Self {
        Self {
            alerts_changed: previous.n_alerts != next.n_alerts,
            states_changed: previous.last_state_id != next.last_state_id,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.alerts_changed && !self.states_changed
    }

    /// Events to publish, in order. A change in the alert count refreshes
    /// both histories; `UpdateStates` is never listed twice.
    pub fn cascade(&self) -> Vec<DashboardEvent> {
        if self.alerts_changed {
            vec![DashboardEvent::UpdateAlerts, DashboardEvent::UpdateStates]
        } else if self.states_changed {
            vec![DashboardEvent::UpdateStates]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub rtime: String,
    #[serde(default)]
    pub state: Severity,
    #[serde(default)]
    pub info: String,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub group: Option<String>,
    #[serde(default)]
    pub alerts: Vec<StateAlert>,
}

impl StateRecord {
    /// Attaches a presentation class to every nested alert.
    pub fn annotate(&mut self) {
        for alert in &mut self.alerts {
            alert.css_class = Some(PresentationClass::for_severity(&alert.severity));
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateAlert {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub ctime: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_class: Option<PresentationClass>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRef {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub ctime: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub server: Option<ItemRef>,
    #[serde(default)]
    pub service: Option<ItemRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatesPayload {
    #[serde(default)]
    pub states: Vec<StateRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertsPayload {
    #[serde(default)]
    pub alerts: Vec<AlertRecord>,
}

fn deserialize_lag<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}
