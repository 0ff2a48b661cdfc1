use chrono::{DateTime, NaiveDateTime, Utc};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use overc_client::HttpClient;
use overc_core::{DashboardEvent, EventBus, Scope, Severity};
use overc_sync::{
    AlertHistory, AlertHistoryController, OverviewController, OverviewState, StateHistory,
    StateHistoryController, StatusBar, StatusBarState, SyncConfig, SyncError,
};
use std::sync::Arc;
use tracing::info;

/// One line of the services pane.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ServiceRow {
    pub server_id: String,
    pub server_name: String,
    pub service_id: String,
    pub service_name: String,
    pub severity: Severity,
    pub info: String,
    pub seen_ago: String,
    pub timed_out: bool,
}

pub(crate) fn service_rows(overview: &OverviewState) -> Vec<ServiceRow> {
    overview
        .servers
        .iter()
        .flat_map(|server| {
            server.services.iter().map(move |service| {
                let state = service.state.as_ref();
                ServiceRow {
                    server_id: server.id.clone(),
                    server_name: server.display_name().to_string(),
                    service_id: service.id.clone(),
                    service_name: service.display_name().to_string(),
                    severity: service.severity(),
                    info: state.map(|s| s.info.clone()).unwrap_or_default(),
                    seen_ago: state.map(|s| s.seen_ago.clone()).unwrap_or_default(),
                    timed_out: state.is_some_and(|s| s.timed_out),
                }
            })
        })
        .collect()
}

/// Everything one frame draws, captured in a single pass.
pub(crate) struct ViewSnapshot {
    pub overview: OverviewState,
    pub rows: Vec<ServiceRow>,
    pub states: Option<StateHistory>,
    pub alerts: AlertHistory,
    pub status: StatusBarState,
}

pub(crate) struct App {
    pub scope: Scope,
    pub base_url: String,
    pub selected: usize,
    pub help_open: bool,
    pub status_note: Option<String>,
    bus: EventBus,
    status_bar: StatusBar,
    overview: OverviewController<HttpClient>,
    states: Option<StateHistoryController<HttpClient>>,
    alerts: AlertHistoryController<HttpClient>,
}

impl App {
    pub(crate) fn new(
        client: Arc<HttpClient>,
        bus: EventBus,
        scope: Scope,
        config: &SyncConfig,
    ) -> Result<Self, SyncError> {
        let status_bar = StatusBar::attach(&bus, config)?;
        let states = match scope {
            Scope::Service(_) => Some(StateHistoryController::new(
                Arc::clone(&client),
                bus.clone(),
                scope.clone(),
                config,
            )?),
            _ => None,
        };
        let alerts =
            AlertHistoryController::new(Arc::clone(&client), bus.clone(), scope.clone(), config)?;
        let overview = OverviewController::new(Arc::clone(&client), bus.clone(), scope.clone(), config)?;
        Ok(Self {
            scope,
            base_url: client.base_url().to_string(),
            selected: 0,
            help_open: false,
            status_note: None,
            bus,
            status_bar,
            overview,
            states,
            alerts,
        })
    }

    pub(crate) fn snapshot(&mut self) -> ViewSnapshot {
        let overview = self.overview.snapshot();
        let rows = service_rows(&overview);
        self.selected = clamp_selection(self.selected, rows.len());
        ViewSnapshot {
            rows,
            overview,
            states: self.states.as_ref().map(StateHistoryController::snapshot),
            alerts: self.alerts.snapshot(),
            status: self.status_bar.snapshot(),
        }
    }

    pub(crate) fn title(&self, view: &ViewSnapshot) -> String {
        match &self.scope {
            Scope::Service(service_id) => view
                .overview
                .service_title()
                .map(str::to_string)
                .unwrap_or_else(|| format!("service {service_id}")),
            Scope::Server(_) => view
                .overview
                .servers
                .first()
                .map(|server| format!("server {}", server.display_name()))
                .unwrap_or_else(|| self.scope.to_string()),
            Scope::Fleet => "fleet".to_string(),
        }
    }

    fn selected_row(&self) -> Option<ServiceRow> {
        service_rows(&self.overview.snapshot())
            .into_iter()
            .nth(self.selected)
    }

    fn delete_selected_service(&mut self) {
        let Some(row) = self.selected_row() else {
            self.status_note = Some("no service selected".to_string());
            return;
        };
        info!(event = "delete_requested", item = "service", id = %row.service_id);
        tokio::spawn(self.overview.delete_service(&row.service_id));
        self.status_note = Some(format!("deleting service {}", row.service_name));
    }

    fn delete_selected_server(&mut self) {
        let Some(row) = self.selected_row() else {
            self.status_note = Some("no server selected".to_string());
            return;
        };
        info!(event = "delete_requested", item = "server", id = %row.server_id);
        tokio::spawn(self.overview.delete_server(&row.server_id));
        self.status_note = Some(format!("deleting server {}", row.server_name));
    }

    fn load_more_states(&mut self) {
        self.status_note = Some(match &self.states {
            Some(states) if states.load_more() => {
                format!("state history: {}h", states.snapshot().window.hours())
            }
            Some(_) => "state history window unchanged".to_string(),
            None => "state history needs a service view".to_string(),
        });
    }

    fn expand_next_group(&mut self) {
        let Some(states) = &self.states else {
            self.status_note = Some("state history needs a service view".to_string());
            return;
        };
        let snapshot = states.snapshot();
        self.status_note = Some(match snapshot.next_collapsed_group() {
            Some(group) if states.expand_group(group) => format!("expanded group {group}"),
            _ => "no collapsed groups".to_string(),
        });
    }

    fn load_more_alerts(&mut self) {
        self.status_note = Some(if self.alerts.load_more() {
            format!("alerts: {}h", self.alerts.snapshot().window.hours())
        } else {
            "alert window unchanged".to_string()
        });
    }

    /// Returns `true` when the user asked to quit.
    pub(crate) fn handle_input(&mut self, event: Event) -> bool {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            _ => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if matches!(key.code, KeyCode::Char('?') | KeyCode::F(1)) {
            self.help_open = !self.help_open;
            return false;
        }
        if key.code == KeyCode::Esc && self.help_open {
            self.help_open = false;
            return false;
        }
        if self.help_open {
            return false;
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('r') => {
                self.bus.publish(DashboardEvent::UpdateServices);
                self.status_note = Some("refresh requested".to_string());
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.selected = self.selected.saturating_add(1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Char('x') => self.delete_selected_service(),
            KeyCode::Char('X') => self.delete_selected_server(),
            KeyCode::Char('a') => self.load_more_alerts(),
            KeyCode::Char('h') => self.load_more_states(),
            KeyCode::Char('e') => self.expand_next_group(),
            _ => {}
        }
        false
    }

    pub(crate) fn shutdown(&mut self) {
        self.overview.dispose();
        if let Some(states) = self.states.as_mut() {
            states.dispose();
        }
        self.alerts.dispose();
    }
}

pub(crate) fn clamp_selection(selected: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        selected.min(len - 1)
    }
}

/// Parses backend timestamps: RFC 3339, or naive UTC with a space or `T`
/// separator.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

pub(crate) fn relative_age(raw: &str, now: DateTime<Utc>) -> String {
    match parse_timestamp(raw) {
        Some(at) => age_label(now.signed_duration_since(at).num_seconds()),
        None => raw.to_string(),
    }
}

pub(crate) fn age_label(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        format!("{seconds}s ago")
    } else if seconds < 3_600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86_400 {
        format!("{}h ago", seconds / 3_600)
    } else {
        format!("{}d ago", seconds / 86_400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 1, 2, 0, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn naive_backend_timestamps_are_utc() {
        assert_eq!(relative_age("2014-01-01 23:59:30", now()), "30s ago");
        assert_eq!(relative_age("2014-01-01 22:59:59.5", now()), "1h ago");
        assert_eq!(relative_age("2014-01-01 23:00:00.123456", now()), "59m ago");
        assert_eq!(relative_age("2014-01-01T23:55:00", now()), "5m ago");
        assert_eq!(relative_age("2013-12-30T00:00:00+00:00", now()), "3d ago");
    }

    #[test]
    fn unparseable_timestamps_render_verbatim() {
        assert_eq!(relative_age("yesterday", now()), "yesterday");
        assert_eq!(relative_age("", now()), "");
    }

    #[test]
    fn future_timestamps_clamp_to_zero() {
        assert_eq!(age_label(-5), "0s ago");
    }

    #[test]
    fn selection_stays_in_bounds() {
        assert_eq!(clamp_selection(5, 0), 0);
        assert_eq!(clamp_selection(5, 3), 2);
        assert_eq!(clamp_selection(1, 3), 1);
    }

    #[test]
    fn rows_flatten_servers_in_order() {
        let overview = OverviewState {
            servers: serde_json::from_value(serde_json::json!([
                {"id": 1, "name": "a", "title": "alpha", "services": [
                    {"id": 10, "name": "app", "state": {"state": "OK", "seen_ago": "0:00:03"}},
                    {"id": 11, "name": "db", "state": {"state": "FAIL", "timed_out": true}}
                ]},
                {"id": 2, "name": "b", "services": [{"id": 20, "name": "cache"}]}
            ]))
            .expect("servers"),
            ..OverviewState::default()
        };

        let rows = service_rows(&overview);
        let names: Vec<_> = rows
            .iter()
            .map(|row| (row.server_name.as_str(), row.service_name.as_str()))
            .collect();
        assert_eq!(names, vec![("alpha", "app"), ("alpha", "db"), ("b", "cache")]);
        assert_eq!(rows[0].seen_ago, "0:00:03");
        assert_eq!(rows[1].severity, Severity::Fail);
        assert!(rows[1].timed_out);
        assert_eq!(rows[2].severity, Severity::Unknown);
        assert_eq!(rows[2].server_id, "2");
    }
}
