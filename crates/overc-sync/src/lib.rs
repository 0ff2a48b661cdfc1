use overc_client::ClientError;
use overc_core::ScopeError;
use thiserror::Error;

pub mod alerts;
pub mod config;
pub mod debounce;
pub mod overview;
pub mod poll;
pub mod states;
pub mod statusbar;
mod view;

#[cfg(test)]
mod test_support;

pub use alerts::{AlertHistory, AlertHistoryController};
pub use config::SyncConfig;
pub use debounce::Debouncer;
pub use overview::{OverviewController, OverviewState};
pub use poll::PollScheduler;
pub use states::{StateHistory, StateHistoryController};
pub use statusbar::{StatusBar, StatusBarState};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("view controllers must be created inside a Tokio runtime")]
    NoRuntime,
    #[error("{view} view needs a {expected} scope, got {found}")]
    ScopeMismatch {
        view: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("scope error: {0}")]
    Scope(#[from] ScopeError),
    #[error("client error: {0}")]
    Client(#[from] ClientError),
}

fn current_runtime() -> Result<tokio::runtime::Handle, SyncError> {
    tokio::runtime::Handle::try_current().map_err(|_| SyncError::NoRuntime)
}
