//! Bounded retry policy for transient backend failures.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries per backend after the first attempt fails transiently.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    /// Wait before the first retry.
    #[serde(default = "default_backoff", with = "duration_ms")]
    pub backoff: Duration,
    /// Growth factor per retry; `1.0` keeps the backoff fixed.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Upper bound on any single wait.
    #[serde(default = "default_max_backoff", with = "duration_ms")]
    pub max_backoff: Duration,
}

fn default_retry_limit() -> u32 { 2 }
fn default_backoff() -> Duration { Duration::from_secs(1) }
fn default_multiplier() -> f64 { 1.0 }
fn default_max_backoff() -> Duration { Duration::from_secs(30) }

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_limit: default_retry_limit(),
            backoff: default_backoff(),
            multiplier: default_multiplier(),
            max_backoff: default_max_backoff(),
        }
    }
}

/// Stateless retry policy. Computes the next delay given the attempt number.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Returns the delay before the `attempt`-th retry (1-based).
    /// Returns `None` if `attempt` exceeds `retry_limit`.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.config.retry_limit {
            return None;
        }
        let base_ms = self.config.backoff.as_millis() as f64
            * self.config.multiplier.max(1.0).powi((attempt - 1) as i32);
        let cap_ms = self.config.max_backoff.as_millis() as f64;
        Some(Duration::from_millis(base_ms.min(cap_ms) as u64))
    }

    /// Total calls one backend may receive for a single query.
    pub fn max_attempts(&self) -> u32 {
        self.config.retry_limit.saturating_add(1)
    }
}

/// Serialize `Duration` as integer milliseconds in config files.
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_backoff_by_default() {
        let policy = RetryPolicy::new(RetryConfig::default());
        assert_eq!(policy.next_delay(1), Some(Duration::from_secs(1)));
        assert_eq!(policy.next_delay(2), Some(Duration::from_secs(1)));
        assert!(policy.next_delay(3).is_none());
        assert_eq!(policy.max_attempts(), 3);
    }

    #[test]
    fn multiplier_grows_until_the_cap() {
        let policy = RetryPolicy::new(RetryConfig {
            retry_limit: 4,
            backoff: Duration::from_millis(200),
            multiplier: 3.0,
            max_backoff: Duration::from_secs(1),
        });
        let waits: Vec<u128> = (1..=4).map(|n| policy.next_delay(n).unwrap().as_millis()).collect();
        assert_eq!(waits, vec![200, 600, 1000, 1000]);
    }

    #[test]
    fn shrinking_multiplier_stays_fixed() {
        let policy = RetryPolicy::new(RetryConfig {
            retry_limit: 3,
            backoff: Duration::from_millis(400),
            multiplier: 0.5,
            ..Default::default()
        });
        for n in 1..=3 {
            assert_eq!(policy.next_delay(n), Some(Duration::from_millis(400)));
        }
    }

    #[test]
    fn zero_retry_limit_means_single_attempt() {
        let policy = RetryPolicy::new(RetryConfig {
            retry_limit: 0,
            ..Default::default()
        });
        assert!(policy.next_delay(1).is_none());
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn config_reads_millis() {
        let cfg: RetryConfig =
            serde_json::from_str(r#"{"retry_limit": 4, "backoff": 250}"#).unwrap();
        assert_eq!(cfg.retry_limit, 4);
        assert_eq!(cfg.backoff, Duration::from_millis(250));
        assert_eq!(cfg.max_backoff, Duration::from_secs(30));
    }
}
