use serde::{Deserialize, Serialize};
use std::fmt;

/// Partial status bar update. Only the fields that are `Some` are merged
/// into the status bar's display state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusBarUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ajax_in_progress: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor_lag: Option<f64>,
}

impl StatusBarUpdate {
    pub fn ajax(in_progress: bool) -> Self {
        Self {
            ajax_in_progress: Some(in_progress),
            ..Self::default()
        }
    }

    pub fn http_error(message: impl Into<String>) -> Self {
        Self {
            http_error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn supervisor_lag(lag: f64) -> Self {
        Self {
            supervisor_lag: Some(lag),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ajax_in_progress.is_none() && self.http_error.is_none() && self.supervisor_lag.is_none()
    }
}

/// Signals exchanged between the view controllers over the [`EventBus`].
///
/// [`EventBus`]: crate::bus::EventBus
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    /// Alert history is stale.
    UpdateAlerts,
    /// State history is stale.
    UpdateStates,
    /// A server or service record was removed; overviews refetch out of cycle.
    UpdateServices,
    StatusBar(StatusBarUpdate),
}

impl DashboardEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DashboardEvent::UpdateAlerts => EventKind::UpdateAlerts,
            DashboardEvent::UpdateStates => EventKind::UpdateStates,
            DashboardEvent::UpdateServices => EventKind::UpdateServices,
            DashboardEvent::StatusBar(_) => EventKind::StatusBar,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    UpdateAlerts,
    UpdateStates,
    UpdateServices,
    StatusBar,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::UpdateAlerts,
        EventKind::UpdateStates,
        EventKind::UpdateServices,
        EventKind::StatusBar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::UpdateAlerts => "update-alerts",
            EventKind::UpdateStates => "update-states",
            EventKind::UpdateServices => "update-services",
            EventKind::StatusBar => "statusbar-state",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_bar_update_serializes_only_present_fields() {
        let update = StatusBarUpdate::supervisor_lag(1.5);
        let json = serde_json::to_value(&update).expect("encode");
        assert_eq!(json, serde_json::json!({"supervisor_lag": 1.5}));
        assert!(!update.is_empty());
        assert!(StatusBarUpdate::default().is_empty());
    }

    #[test]
    fn event_kinds_keep_their_channel_names() {
        let names: Vec<&str> = EventKind::ALL.iter().map(EventKind::as_str).collect();
        assert_eq!(
            names,
            vec![
                "update-alerts",
                "update-states",
                "update-services",
                "statusbar-state"
            ]
        );
        assert_eq!(
            DashboardEvent::StatusBar(StatusBarUpdate::ajax(true)).kind(),
            EventKind::StatusBar
        );
    }
}
