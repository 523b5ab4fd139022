//! Per-host exponential backoff tracking for the provider clients
//!
//! Clients record transient failures (timeouts, 429s, 5xx) against the host
//! they hit and consult the tracker when classifying an error. Nothing here
//! sleeps; the delay is advisory and surfaces in error descriptors.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

const MIN_BACKOFF_SECS: u64 = 5;
const MAX_BACKOFF_SECS: u64 = 60;
/// Time after which an idle key's backoff resets
const RESET_AFTER_SECS: u64 = 120;

#[derive(Debug, Clone)]
struct BackoffState {
    current_delay: u64,
    last_error_at: Instant,
    error_count: u32,
}

impl Default for BackoffState {
    fn default() -> Self {
        BackoffState {
            current_delay: MIN_BACKOFF_SECS,
            last_error_at: Instant::now(),
            error_count: 0,
        }
    }
}

/// Backoff state per host key.
pub struct BackoffTracker {
    states: RwLock<HashMap<String, BackoffState>>,
}

impl BackoffTracker {
    pub fn new() -> Self {
        BackoffTracker {
            states: RwLock::new(HashMap::new()),
        }
    }

    pub fn global() -> &'static BackoffTracker {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<BackoffTracker> = OnceLock::new();
        INSTANCE.get_or_init(BackoffTracker::new)
    }

    /// Record a success, resetting the key's backoff.
    pub fn record_success(&self, key: &str) {
        if let Ok(mut states) = self.states.write() {
            states.remove(key);
        }
    }

    /// Record a transient failure and return the advisory delay in seconds.
    pub fn record_error(&self, key: &str) -> u64 {
        let mut states = match self.states.write() {
            Ok(s) => s,
            Err(_) => return MIN_BACKOFF_SECS,
        };

        let state = states.entry(key.to_string()).or_default();
        let now = Instant::now();

        if now.duration_since(state.last_error_at) > Duration::from_secs(RESET_AFTER_SECS) {
            state.current_delay = MIN_BACKOFF_SECS;
            state.error_count = 1;
        } else {
            state.error_count += 1;
            if state.error_count > 1 {
                state.current_delay = (state.current_delay * 2).min(MAX_BACKOFF_SECS);
            }
        }

        state.last_error_at = now;
        let delay = state.current_delay;

        log::warn!(
            "[HTTP_RETRY] Error #{} for '{}', backoff: {}s",
            state.error_count,
            key,
            delay
        );

        delay
    }

    /// Transient HTTP statuses worth backing off for.
    pub fn is_retryable_status(status: u16) -> bool {
        matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
    }
}

impl Default for BackoffTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Check whether a reqwest error is transient.
pub fn is_reqwest_error_retryable(err: &reqwest::Error) -> bool {
    err.is_timeout()
        || err.is_connect()
        || err
            .status()
            .map(|s| BackoffTracker::is_retryable_status(s.as_u16()))
            .unwrap_or(false)
}
