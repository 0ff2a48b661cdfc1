use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
/// Poll period used by the earliest protocol revision.
pub const LEGACY_POLL_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;
pub const DEFAULT_HTTP_ERROR_TTL_MS: u64 = 3_000;
pub const DEFAULT_LOOKBACK_HOURS: u32 = 24;
pub const DEFAULT_LOOKBACK_STEP_HOURS: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    pub debounce: Duration,
    pub http_error_ttl: Duration,
    pub lookback_hours: u32,
    pub lookback_step_hours: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            http_error_ttl: Duration::from_millis(DEFAULT_HTTP_ERROR_TTL_MS),
            lookback_hours: DEFAULT_LOOKBACK_HOURS,
            lookback_step_hours: DEFAULT_LOOKBACK_STEP_HOURS,
        }
    }
}

impl SyncConfig {
    pub fn legacy() -> Self {
        Self {
            poll_interval: Duration::from_millis(LEGACY_POLL_INTERVAL_MS),
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}
