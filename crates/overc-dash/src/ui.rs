use chrono::{DateTime, Utc};
use overc_core::{AlertRecord, PresentationClass, Scope, Severity, StateRecord};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::app::{relative_age, App, ServiceRow, ViewSnapshot};

const COMPACT_WIDTH: u16 = 92;
/// Supervisor lag above this many seconds is shown as a warning.
const LAG_WARN_SECS: f64 = 30.0;

#[derive(Clone, Copy)]
struct DashTheme {
    bg: Color,
    border: Color,
    title: Color,
    text: Color,
    muted: Color,
    accent: Color,
    ok: Color,
    warn: Color,
    critical: Color,
}

fn dash_theme() -> DashTheme {
    DashTheme {
        bg: Color::Rgb(11, 18, 32),
        border: Color::Rgb(71, 85, 105),
        title: Color::Rgb(191, 219, 254),
        text: Color::Rgb(226, 232, 240),
        muted: Color::Rgb(148, 163, 184),
        accent: Color::Rgb(56, 189, 248),
        ok: Color::Rgb(34, 197, 94),
        warn: Color::Rgb(245, 158, 11),
        critical: Color::Rgb(239, 68, 68),
    }
}

fn class_color(class: PresentationClass, theme: DashTheme) -> Color {
    match class {
        PresentationClass::Success => theme.ok,
        PresentationClass::Warning => theme.warn,
        PresentationClass::Danger => theme.critical,
        PresentationClass::Default => theme.muted,
    }
}

fn severity_style(severity: &Severity, theme: DashTheme) -> Style {
    Style::default()
        .fg(class_color(severity.class(), theme))
        .add_modifier(Modifier::BOLD)
}

fn panel(title: &str, theme: DashTheme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .title(Span::styled(
            title.to_string(),
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        ))
}

pub(crate) fn render_ui(frame: &mut ratatui::Frame, app: &App, view: &ViewSnapshot) {
    let size = frame.size();
    let theme = dash_theme();
    let now = Utc::now();
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(size);
    frame.render_widget(render_header(app, view, theme, size.width, now), outer[0]);

    match app.scope {
        Scope::Service(_) => {
            let body = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(5),
                    Constraint::Min(6),
                    Constraint::Percentage(35),
                ])
                .split(outer[1]);
            frame.render_widget(render_service_detail(view, theme), body[0]);
            frame.render_widget(render_states(view, theme, now), body[1]);
            frame.render_widget(render_alerts(view, theme, now), body[2]);
        }
        Scope::Fleet | Scope::Server(_) => {
            let body = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(6), Constraint::Percentage(40)])
                .split(outer[1]);
            render_services(frame, app, view, theme, body[0]);
            frame.render_widget(render_alerts(view, theme, now), body[1]);
        }
    }

    if app.help_open {
        render_help_overlay(frame, theme);
    }
}

fn render_header(
    app: &App,
    view: &ViewSnapshot,
    theme: DashTheme,
    width: u16,
    now: DateTime<Utc>,
) -> Paragraph<'static> {
    let compact = width < COMPACT_WIDTH;
    let inner_width = width.saturating_sub(4) as usize;
    let activity = if view.status.ajax_in_progress {
        Span::styled("● loading", Style::default().fg(theme.accent))
    } else {
        Span::styled("○ idle", Style::default().fg(theme.muted))
    };
    let lag = view.status.supervisor_lag;
    let updated = view
        .overview
        .last_updated
        .map(|at| crate::app::age_label(now.signed_duration_since(at).num_seconds()))
        .unwrap_or_else(|| "never".to_string());

    let mut status = vec![
        Span::styled(
            ellipsize(&app.title(view), if compact { 24 } else { 40 }),
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        activity,
        Span::raw("  "),
        Span::styled(lag_label(lag), Style::default().fg(lag_color(lag, theme))),
        Span::styled(format!("  updated {updated}"), Style::default().fg(theme.muted)),
    ];
    if !compact {
        status.push(Span::styled(
            format!("  {}", app.base_url),
            Style::default().fg(theme.muted),
        ));
    }

    let second = if let Some(error) = view.status.http_error.as_deref() {
        Line::from(Span::styled(
            ellipsize(error, inner_width.max(12)),
            Style::default().fg(theme.critical),
        ))
    } else {
        let note = app.status_note.as_deref().unwrap_or("ready (? help)");
        Line::from(Span::styled(
            ellipsize(note, inner_width.max(12)),
            Style::default().fg(theme.muted),
        ))
    };

    Paragraph::new(Text::from(vec![Line::from(status), second]))
        .style(Style::default().fg(theme.text).bg(theme.bg))
        .block(panel("overc", theme))
}

fn lag_label(lag: Option<f64>) -> String {
    match lag {
        Some(lag) => format!("lag {lag:.1}s"),
        None => "lag --".to_string(),
    }
}

fn lag_color(lag: Option<f64>, theme: DashTheme) -> Color {
    match lag {
        Some(lag) if lag > LAG_WARN_SECS => theme.warn,
        Some(_) => theme.ok,
        None => theme.muted,
    }
}

fn service_line(row: &ServiceRow, theme: DashTheme, show_server: bool) -> Line<'static> {
    let mut spans = vec![Span::styled(
        format!("{:<5}", row.severity.as_str()),
        severity_style(&row.severity, theme),
    )];
    if show_server {
        spans.push(Span::styled(
            format!("{}/", row.server_name),
            Style::default().fg(theme.muted),
        ));
    }
    spans.push(Span::styled(
        row.service_name.clone(),
        Style::default().fg(theme.text),
    ));
    if row.timed_out {
        spans.push(Span::styled(
            " timed out",
            Style::default().fg(theme.critical),
        ));
    }
    if !row.seen_ago.is_empty() {
        spans.push(Span::styled(
            format!("  seen {} ago", row.seen_ago),
            Style::default().fg(theme.muted),
        ));
    }
    if !row.info.is_empty() {
        spans.push(Span::styled(
            format!("  {}", row.info),
            Style::default().fg(theme.muted),
        ));
    }
    Line::from(spans)
}

fn render_services(
    frame: &mut ratatui::Frame,
    app: &App,
    view: &ViewSnapshot,
    theme: DashTheme,
    area: Rect,
) {
    let title = format!("Services ({})", view.rows.len());
    if view.rows.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No services reported yet.",
            Style::default().fg(theme.muted),
        ))
        .block(panel(&title, theme));
        frame.render_widget(empty, area);
        return;
    }

    let show_server = matches!(app.scope, Scope::Fleet);
    let items: Vec<ListItem> = view
        .rows
        .iter()
        .map(|row| ListItem::new(service_line(row, theme, show_server)))
        .collect();
    let list = List::new(items)
        .block(panel(&title, theme))
        .highlight_style(Style::default().bg(theme.border).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select(Some(app.selected));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_service_detail(view: &ViewSnapshot, theme: DashTheme) -> Paragraph<'static> {
    let lines = match view.rows.first() {
        Some(row) => vec![
            service_line(row, theme, true),
            Line::from(Span::styled(
                format!("server {}  service id {}", row.server_name, row.service_id),
                Style::default().fg(theme.muted),
            )),
        ],
        None => vec![Line::from(Span::styled(
            "Waiting for the first status poll.",
            Style::default().fg(theme.muted),
        ))],
    };
    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(panel("Service", theme))
}

fn state_lines(
    record: &StateRecord,
    collapsed: bool,
    theme: DashTheme,
    now: DateTime<Utc>,
) -> Vec<Line<'static>> {
    let mut header = vec![
        Span::styled(
            format!("{:<9}", relative_age(&record.rtime, now)),
            Style::default().fg(theme.muted),
        ),
        Span::styled(
            format!("{:<5}", record.state.as_str()),
            severity_style(&record.state, theme),
        ),
        Span::styled(record.info.clone(), Style::default().fg(theme.text)),
    ];
    if collapsed {
        if let Some(group) = &record.group {
            header.push(Span::styled(
                format!("  [+{group}]"),
                Style::default().fg(theme.accent),
            ));
        }
    }

    let mut lines = vec![Line::from(header)];
    for alert in &record.alerts {
        let class = alert
            .css_class
            .unwrap_or_else(|| alert.severity.class());
        lines.push(Line::from(vec![
            Span::raw("    "),
            Span::styled(
                format!("{:<5}", alert.severity.as_str()),
                Style::default().fg(class_color(class, theme)),
            ),
            Span::styled(alert.title.clone(), Style::default().fg(theme.text)),
            Span::styled(
                format!("  {}", alert.message),
                Style::default().fg(theme.muted),
            ),
        ]));
    }
    lines
}

fn render_states(view: &ViewSnapshot, theme: DashTheme, now: DateTime<Utc>) -> Paragraph<'static> {
    let Some(history) = &view.states else {
        return Paragraph::new("").block(panel("States", theme));
    };
    let title = format!(
        "States ({}h, {} records)",
        history.window.hours(),
        history.states.len()
    );
    let lines: Vec<Line> = if history.states.is_empty() {
        vec![Line::from(Span::styled(
            "No state changes in this window.",
            Style::default().fg(theme.muted),
        ))]
    } else {
        history
            .states
            .iter()
            .flat_map(|record| {
                let collapsed = record
                    .group
                    .as_deref()
                    .is_some_and(|group| !history.expanded.contains(group));
                state_lines(record, collapsed, theme, now)
            })
            .collect()
    };
    Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel(&title, theme))
}

fn alert_line(alert: &AlertRecord, theme: DashTheme, now: DateTime<Utc>) -> Line<'static> {
    let mut spans = vec![
        Span::styled(
            format!("{:<9}", relative_age(&alert.ctime, now)),
            Style::default().fg(theme.muted),
        ),
        Span::styled(
            format!("{:<5}", alert.severity.as_str()),
            severity_style(&alert.severity, theme),
        ),
    ];
    let origin = match (&alert.server, &alert.service) {
        (Some(server), Some(service)) => Some(format!("{}/{}", server.name, service.name)),
        (Some(server), None) => Some(server.name.clone()),
        (None, Some(service)) => Some(service.name.clone()),
        (None, None) => None,
    };
    if let Some(origin) = origin {
        spans.push(Span::styled(
            format!("{origin}  "),
            Style::default().fg(theme.accent),
        ));
    }
    spans.push(Span::styled(alert.title.clone(), Style::default().fg(theme.text)));
    if !alert.message.is_empty() {
        spans.push(Span::styled(
            format!("  {}", alert.message),
            Style::default().fg(theme.muted),
        ));
    }
    Line::from(spans)
}

fn render_alerts(view: &ViewSnapshot, theme: DashTheme, now: DateTime<Utc>) -> Paragraph<'static> {
    let history = &view.alerts;
    let title = format!(
        "Alerts ({}h, {} shown)",
        history.window.hours(),
        history.alerts.len()
    );
    let lines: Vec<Line> = if history.alerts.is_empty() {
        vec![Line::from(Span::styled(
            "No alerts in this window.",
            Style::default().fg(theme.muted),
        ))]
    } else {
        history
            .alerts
            .iter()
            .map(|alert| alert_line(alert, theme, now))
            .collect()
    };
    Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel(&title, theme))
}

fn render_help_overlay(frame: &mut ratatui::Frame, theme: DashTheme) {
    let area = centered_rect(60, 60, frame.size());
    let key = |key: &'static str, action: &'static str| {
        Line::from(vec![
            Span::styled(format!("{key:<8}"), Style::default().fg(theme.accent)),
            Span::styled(action, Style::default().fg(theme.text)),
        ])
    };
    let lines = vec![
        Line::from(Span::styled(
            "Controls",
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        )),
        key("q", "quit"),
        key("r", "refresh every view"),
        key("j/k", "select service"),
        key("x", "delete selected service"),
        key("X", "delete selected server"),
        key("a", "load 24h more alerts"),
        key("h", "load 24h more state history"),
        key("e", "expand newest collapsed group"),
        key("? Esc", "close help"),
    ];
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .style(Style::default().bg(theme.bg))
            .block(panel("Help", theme)),
        area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
        ])
        .split(vertical[1])[1]
}

fn ellipsize(input: &str, max: usize) -> String {
    if input.chars().count() <= max {
        return input.to_string();
    }
    if max <= 3 {
        return "...".chars().take(max).collect();
    }
    let prefix: String = input.chars().take(max - 3).collect();
    format!("{prefix}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ellipsize_respects_char_budget() {
        assert_eq!(ellipsize("short", 10), "short");
        assert_eq!(ellipsize("a longer title", 8), "a lon...");
        assert_eq!(ellipsize("abcdef", 2), "..");
    }

    #[test]
    fn severity_colours_follow_presentation_class() {
        let theme = dash_theme();
        assert_eq!(class_color(Severity::Ok.presentation(), theme), theme.ok);
        assert_eq!(class_color(Severity::Fail.presentation(), theme), theme.critical);
        assert_eq!(class_color(Severity::Unknown.presentation(), theme), theme.muted);
        assert_eq!(
            class_color(Severity::from_wire("MAYBE").presentation(), theme),
            theme.muted
        );
    }

    #[test]
    fn styling_unmapped_severity_does_not_warn() {
        use std::sync::{Arc, Mutex};
        use tracing_subscriber::fmt::MakeWriter;

        #[derive(Clone, Default)]
        struct Capture(Arc<Mutex<Vec<u8>>>);

        impl std::io::Write for Capture {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().expect("capture lock").extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        impl<'a> MakeWriter<'a> for Capture {
            type Writer = Capture;

            fn make_writer(&'a self) -> Self::Writer {
                self.clone()
            }
        }

        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .finish();
        let theme = dash_theme();
        let severity = Severity::from_wire("MAYBE");

        tracing::subscriber::with_default(subscriber, || {
            for _ in 0..3 {
                assert_eq!(severity_style(&severity, theme).fg, Some(theme.muted));
            }
            let _ = severity.presentation();
        });

        let logged = String::from_utf8(capture.0.lock().expect("capture lock").clone())
            .expect("utf8 log");
        assert_eq!(logged.matches("severity_contract_violation").count(), 1);
    }

    #[test]
    fn lag_is_flagged_past_threshold() {
        let theme = dash_theme();
        assert_eq!(lag_label(None), "lag --");
        assert_eq!(lag_label(Some(1.24)), "lag 1.2s");
        assert_eq!(lag_color(Some(45.0), theme), theme.warn);
        assert_eq!(lag_color(Some(2.0), theme), theme.ok);
    }

    #[test]
    fn collapsed_group_is_marked() {
        let record: StateRecord = serde_json::from_value(serde_json::json!({
            "id": 1, "state": "WARN", "info": "slow", "group": "g7",
            "alerts": [{"severity": "WARN", "title": "latency"}]
        }))
        .expect("record");
        let now = Utc::now();
        let lines = state_lines(&record, true, dash_theme(), now);
        assert_eq!(lines.len(), 2);
        let header: String = lines[0].spans.iter().map(|span| span.content.as_ref()).collect();
        assert!(header.contains("[+g7]"));

        let expanded = state_lines(&record, false, dash_theme(), now);
        let header: String = expanded[0].spans.iter().map(|span| span.content.as_ref()).collect();
        assert!(!header.contains("[+g7]"));
    }
}
