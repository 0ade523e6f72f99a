//! Ordered fallback chain of backends with bounded per-backend retry.
//!
//! Per query:
//! - `Ok(Some(_))`          → resolved, stop
//! - `Ok(None)`             → next backend, no retry
//! - transient `Err`        → back off and retry the same backend, up to `retry_limit`
//! - permanent `Err`        → next backend, no retry
//! - chain exhausted        → absence

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::backend::Geocoder;
use crate::config::BatchConfig;
use crate::error::ConfigError;
use crate::policy::{RetryConfig, RetryPolicy};
use crate::types::Coordinate;

/// Terminal state of one query walked through the chain.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    Resolved {
        coordinate: Coordinate,
        backend: String,
        attempts: u32,
    },
    Exhausted {
        attempts: u32,
    },
}

impl ChainOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Resolved { attempts, .. } | Self::Exhausted { attempts } => *attempts,
        }
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            Self::Resolved { coordinate, .. } => Some(*coordinate),
            Self::Exhausted { .. } => None,
        }
    }
}

/// An ordered, non-empty list of backends tried in sequence.
#[derive(Clone)]
pub struct FallbackChain {
    backends: Vec<Arc<dyn Geocoder>>,
    retry: RetryPolicy,
    inter_call_delay: Duration,
}

impl FallbackChain {
    pub fn new(
        backends: Vec<Arc<dyn Geocoder>>,
        retry: RetryConfig,
        inter_call_delay: Duration,
    ) -> Result<Self, ConfigError> {
        if backends.is_empty() {
            return Err(ConfigError::NoBackends);
        }
        Ok(Self {
            backends,
            retry: RetryPolicy::new(retry),
            inter_call_delay,
        })
    }

    pub fn from_config(
        backends: Vec<Arc<dyn Geocoder>>,
        config: &BatchConfig,
    ) -> Result<Self, ConfigError> {
        Self::new(backends, config.retry.clone(), config.inter_call_delay)
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn backend_names(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.name().to_string()).collect()
    }

    /// Walk the chain for one trimmed, non-empty query.
    pub async fn resolve(&self, query: &str) -> ChainOutcome {
        self.resolve_counted(query, &AtomicU32::new(0)).await
    }

    /// Like [`resolve`](Self::resolve), also bumping `calls` as each backend
    /// call starts so the count survives if the walk never returns.
    pub async fn resolve_counted(&self, query: &str, calls: &AtomicU32) -> ChainOutcome {
        let mut attempts = 0u32;

        for backend in &self.backends {
            let name = backend.name();
            let mut retries = 0u32;
            loop {
                attempts += 1;
                calls.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(backend = name, attempt = retries + 1, query, "geocoding");
                let result = backend.resolve(query).await;
                self.pause_after_call().await;

                match result {
                    Ok(Some(coordinate)) => {
                        return ChainOutcome::Resolved {
                            coordinate,
                            backend: name.to_string(),
                            attempts,
                        };
                    }
                    Ok(None) => {
                        tracing::debug!(backend = name, query, "no match, trying next backend");
                        break;
                    }
                    Err(e) if e.is_transient() => {
                        retries += 1;
                        match self.retry.next_delay(retries) {
                            Some(delay) => {
                                tracing::warn!(
                                    backend = name,
                                    attempt = retries,
                                    delay_ms = delay.as_millis() as u64,
                                    error = %e,
                                    "retrying lookup"
                                );
                                tokio::time::sleep(delay).await;
                            }
                            None => {
                                tracing::warn!(
                                    backend = name,
                                    attempts = retries,
                                    error = %e,
                                    "retries exhausted, trying next backend"
                                );
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            backend = name,
                            error = %e,
                            "permanent failure, trying next backend"
                        );
                        break;
                    }
                }
            }
        }

        ChainOutcome::Exhausted { attempts }
    }

    async fn pause_after_call(&self) {
        if !self.inter_call_delay.is_zero() {
            tokio::time::sleep(self.inter_call_delay).await;
        }
    }
}

impl std::fmt::Debug for FallbackChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackChain")
            .field("backends", &self.backend_names())
            .field("retry", &self.retry.config)
            .field("inter_call_delay", &self.inter_call_delay)
            .finish()
    }
}
