mod app;
mod ui;

use clap::Parser;
use crossterm::{
    event::EventStream,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use overc_client::{http::DEFAULT_REQUEST_TIMEOUT_SECS, HttpClient};
use overc_core::{EventBus, RouteParams, Scope};
use overc_sync::SyncConfig;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{error::Error, io, sync::Arc, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::App;

const RENDER_REFRESH_MS: u64 = 250;

#[derive(Parser, Debug)]
#[command(name = "overc-dash", about = "Terminal dashboard for an overc monitoring server")]
struct Args {
    /// Root URL of the overc server.
    #[arg(long, env = "OVERC_URL", default_value = "http://127.0.0.1:5000/")]
    base_url: String,
    /// Show a single server.
    #[arg(long, env = "OVERC_SERVER_ID")]
    server_id: Option<String>,
    /// Show a single service with its state history.
    #[arg(long, env = "OVERC_SERVICE_ID")]
    service_id: Option<String>,
    /// Status poll period in milliseconds.
    #[arg(long, env = "OVERC_POLL_MS")]
    poll_ms: Option<u64>,
    #[arg(long, env = "OVERC_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    request_timeout_secs: u64,
}

#[derive(Clone, Debug)]
struct Config {
    base_url: String,
    scope: Scope,
    request_timeout: Duration,
    sync: SyncConfig,
}

fn load_config(args: Args) -> Result<Config, Box<dyn Error>> {
    let scope = Scope::from_route(&RouteParams {
        server_id: args.server_id,
        service_id: args.service_id,
    })?;
    let mut sync = SyncConfig::default();
    if let Some(poll_ms) = args.poll_ms.filter(|ms| *ms > 0) {
        sync = sync.with_poll_interval(Duration::from_millis(poll_ms));
    }
    Ok(Config {
        base_url: args.base_url,
        scope,
        request_timeout: Duration::from_secs(args.request_timeout_secs.max(1)),
        sync,
    })
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_enabled = matches!(
        std::env::var("OVERC_LOG_STDOUT").ok().as_deref(),
        Some("1") | Some("true") | Some("TRUE") | Some("yes") | Some("YES")
    );
    if stdout_enabled {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .try_init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = load_config(Args::parse())?;
    init_logging();

    let bus = EventBus::new();
    let client = Arc::new(HttpClient::new(
        &config.base_url,
        config.request_timeout,
        bus.clone(),
    )?);
    let mut app = App::new(client, bus, config.scope.clone(), &config.sync)?;
    info!(
        event = "dashboard_start",
        base_url = %config.base_url,
        scope = %config.scope,
        poll_ms = config.sync.poll_interval.as_millis() as u64
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let mut events = EventStream::new();
    let mut render_ticker = tokio::time::interval(Duration::from_millis(RENDER_REFRESH_MS));
    render_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        let view = app.snapshot();
        terminal.draw(|frame| ui::render_ui(frame, &app, &view))?;
        tokio::select! {
            _ = render_ticker.tick() => {}
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(event)) => {
                        if app.handle_input(event) {
                            break;
                        }
                    }
                    Some(Err(_)) | None => break,
                }
            }
        }
    }

    app.shutdown();
    info!(event = "dashboard_stop");
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
