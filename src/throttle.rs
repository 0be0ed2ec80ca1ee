//! Process-wide request spacing.
//!
//! [`RequestThrottle`] guarantees that no two network calls issued through
//! it start less than `min_interval` apart. It is global rather than
//! per-endpoint: the upstream rate limit applies to the aggregate of all
//! calls, whatever coin or endpoint they target.
//!
//! Callers are served one at a time. The lock is held across the wait, so
//! concurrent callers queue behind each other instead of all waking at the
//! same deadline and firing together.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::telemetry;

/// Minimum spacing between two issued network calls.
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Gate enforcing a minimum interval between outbound calls.
#[derive(Debug)]
pub struct RequestThrottle {
    min_interval: Duration,
    last_request_at: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    /// Create a throttle with the default [`MIN_INTERVAL`].
    pub fn new() -> Self {
        Self::with_interval(MIN_INTERVAL)
    }

    /// Create a throttle with a custom minimum interval.
    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request_at: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until it is safe to issue the next call, then claim the slot.
    ///
    /// Returns how long the caller was delayed. A call is delayed, never
    /// dropped.
    pub async fn await_turn(&self) -> Duration {
        let mut last = self.last_request_at.lock().await;

        let mut waited = Duration::ZERO;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                waited = self.min_interval - elapsed;
                metrics::counter!(telemetry::THROTTLE_WAITS_TOTAL).increment(1);
                debug!(wait_ms = waited.as_millis() as u64, "throttling request");
                tokio::time::sleep(waited).await;
            }
        }

        *last = Some(Instant::now());
        waited
    }

    /// Instant of the most recently issued call, if any.
    pub async fn last_request_at(&self) -> Option<Instant> {
        *self.last_request_at.lock().await
    }
}

impl Default for RequestThrottle {
    fn default() -> Self {
        Self::new()
    }
}
