//! Default values for configuration options.
//!
//! Centralized constants to avoid magic numbers scattered across the codebase.

use std::time::Duration;

/// Default interval between ticks in seconds.
pub const INTERVAL_SECS: u64 = 1;

/// Default per-fetch timeout in seconds.
pub const FETCH_TIMEOUT_SECS: u64 = 5;

/// Default number of ticks between progress summaries.
pub const PROGRESS_EVERY: u64 = 100;

/// Default wait for the poller to confirm it stopped, in seconds.
pub const STOP_WAIT_SECS: u64 = 5;

/// `strftime` pattern for the default output file name.
pub const OUTPUT_FILE_PATTERN: &str = "monitor_%Y%m%d_%H%M%S.csv";

/// Default tick interval as Duration.
#[must_use]
pub const fn interval() -> Duration {
    Duration::from_secs(INTERVAL_SECS)
}

/// Default fetch timeout as Duration.
#[must_use]
pub const fn fetch_timeout() -> Duration {
    Duration::from_secs(FETCH_TIMEOUT_SECS)
}

/// Default stop wait as Duration.
#[must_use]
pub const fn stop_wait() -> Duration {
    Duration::from_secs(STOP_WAIT_SECS)
}
