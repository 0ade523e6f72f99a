//! Batch tunables.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;
use crate::policy::retry::{duration_ms, RetryConfig};

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Upper bound on queries in flight at once. Must be at least 1.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    /// Pause after every completed backend call, per task.
    #[serde(default, with = "duration_ms")]
    pub inter_call_delay: Duration,
    /// Per-backend retry behaviour on transient failures.
    #[serde(flatten)]
    pub retry: RetryConfig,
}

fn default_max_parallel() -> usize { 8 }

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            inter_call_delay: Duration::ZERO,
            retry: RetryConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Config with the three contract tunables and the default backoff.
    pub fn new(max_parallel: usize, retry_limit: u32, inter_call_delay: Duration) -> Self {
        Self {
            max_parallel,
            inter_call_delay,
            retry: RetryConfig {
                retry_limit,
                ..RetryConfig::default()
            },
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.retry.backoff = backoff;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_parallel == 0 {
            return Err(ConfigError::ZeroParallelism);
        }
        Ok(())
    }
}
