//! Per-adapter request pacing

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Enforces a minimum interval between consecutive requests of one adapter
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    /// Time the most recent request was (or will be) released
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Reserve the next request slot and sleep until it opens
    pub async fn wait(&self) {
        let wait_time = {
            let mut last_request = self.last_request.lock();
            let now = Instant::now();
            let release = match *last_request {
                Some(previous) => (previous + self.min_interval).max(now),
                None => now,
            };
            *last_request = Some(release);
            release.saturating_duration_since(now)
        };

        if !wait_time.is_zero() {
            tracing::debug!(wait_ms = wait_time.as_millis() as u64, "throttling request");
            tokio::time::sleep(wait_time).await;
        }
    }

    pub fn last_request(&self) -> Option<Instant> {
        *self.last_request.lock()
    }
}
