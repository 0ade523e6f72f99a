//! Minimum-interval pacer for courtesy-limited providers.
//!
//! Reserves call slots `interval` apart. Concurrent callers queue up behind
//! the last reserved slot, so at most one call starts per `interval` no
//! matter how many tasks share the pacer.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Thread-safe call pacer shared by every task using one backend.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Requests per second → pacer. Non-positive rates disable pacing.
    pub fn per_second(rate: f64) -> Self {
        if rate > 0.0 && rate.is_finite() {
            Self::new(Duration::from_secs_f64(1.0 / rate))
        } else {
            Self::new(Duration::ZERO)
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reserve the next slot and return how long the caller must wait for it.
    pub fn reserve(&self) -> Duration {
        if self.interval.is_zero() {
            return Duration::ZERO;
        }
        let mut next = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let slot = next.map_or(now, |n| n.max(now));
        *next = Some(slot + self.interval);
        slot - now
    }

    /// Wait until this caller's slot opens.
    pub async fn wait(&self) {
        let wait = self.reserve();
        if !wait.is_zero() {
            tracing::debug!(wait_ms = wait.as_millis() as u64, "pacing backend call");
            tokio::time::sleep(wait).await;
        }
    }
}
