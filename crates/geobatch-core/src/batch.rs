//! `BatchGeocoder`: bounded-parallel, order-preserving batch lookups.
//!
//! Every non-blank query becomes one task on a [`JoinSet`]; a shared
//! [`Semaphore`] caps how many run at once. Tasks return their input index
//! alongside the result and the collector writes into a pre-sized slot, so
//! output order never depends on completion order.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::backend::Geocoder;
use crate::chain::{ChainOutcome, FallbackChain};
use crate::config::BatchConfig;
use crate::error::ConfigError;
use crate::types::{normalize_query, LookupOutcome, LookupResult};

type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Resolves whole query lists through a [`FallbackChain`].
pub struct BatchGeocoder {
    chain: Arc<FallbackChain>,
    max_parallel: usize,
    on_progress: Option<ProgressFn>,
}

impl BatchGeocoder {
    /// Validate `config` and build the chain. Fails on zero backends or
    /// `max_parallel == 0`.
    pub fn new(
        backends: Vec<Arc<dyn Geocoder>>,
        config: BatchConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let chain = FallbackChain::from_config(backends, &config)?;
        Ok(Self {
            chain: Arc::new(chain),
            max_parallel: config.max_parallel,
            on_progress: None,
        })
    }

    /// Called with `(done, total)` each time a query reaches a terminal state.
    pub fn with_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(f));
        self
    }

    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Resolve every query. The output has exactly one entry per input, in
    /// input order.
    pub async fn run(&self, queries: &[String]) -> Vec<LookupResult> {
        let total = queries.len();
        let mut slots: Vec<Option<LookupResult>> = vec![None; total];
        // Anything above MAX_PERMITS is effectively unbounded.
        let semaphore = Arc::new(Semaphore::new(self.max_parallel.min(Semaphore::MAX_PERMITS)));
        let mut tasks = JoinSet::new();
        let mut pending: BTreeMap<usize, (String, Arc<AtomicU32>)> = BTreeMap::new();
        let mut done = 0usize;

        info!(
            queries = total,
            max_parallel = self.max_parallel,
            backends = ?self.chain.backend_names(),
            "batch started"
        );

        for (index, raw) in queries.iter().enumerate() {
            let Some(query) = normalize_query(raw) else {
                slots[index] = Some(LookupResult::blank(index));
                done += 1;
                self.report(done, total);
                continue;
            };
            let query = query.to_string();
            let calls = Arc::new(AtomicU32::new(0));
            pending.insert(index, (query.clone(), Arc::clone(&calls)));

            let chain = Arc::clone(&self.chain);
            let permits = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // The semaphore is never closed, so acquire only fails after drop.
                let _permit = permits.acquire_owned().await.ok();
                let outcome = chain.resolve_counted(&query, &calls).await;
                (index, into_result(index, query, outcome))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    pending.remove(&index);
                    slots[index] = Some(result);
                }
                Err(e) => {
                    // The index is lost with the task; the slot is filled below.
                    error!(error = %e, "lookup task failed");
                }
            }
            done += 1;
            self.report(done, total);
        }

        let results: Vec<LookupResult> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| match pending.remove(&index) {
                    Some((query, calls)) => {
                        LookupResult::exhausted(index, query, calls.load(Ordering::Relaxed))
                    }
                    None => LookupResult::exhausted(index, String::new(), 0),
                })
            })
            .collect();

        let summary = BatchSummary::from_results(&results);
        info!(
            total = summary.total,
            resolved = summary.resolved,
            exhausted = summary.exhausted,
            blank = summary.blank,
            "batch complete"
        );
        results
    }

    fn report(&self, done: usize, total: usize) {
        if let Some(cb) = &self.on_progress {
            cb(done, total);
        }
    }
}

impl std::fmt::Debug for BatchGeocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchGeocoder")
            .field("chain", &self.chain)
            .field("max_parallel", &self.max_parallel)
            .finish()
    }
}

fn into_result(index: usize, query: String, outcome: ChainOutcome) -> LookupResult {
    match outcome {
        ChainOutcome::Resolved {
            coordinate,
            backend,
            attempts,
        } => LookupResult {
            index,
            query,
            coordinate: Some(coordinate),
            backend: Some(backend),
            outcome: LookupOutcome::Resolved,
            attempts,
        },
        ChainOutcome::Exhausted { attempts } => LookupResult::exhausted(index, query, attempts),
    }
}

/// Resolve `queries` in order through `backends`.
///
/// Blank entries come back as [`LookupOutcome::Blank`] without touching any
/// backend. Only configuration problems are errors; per-query failures are
/// recorded as [`LookupOutcome::Exhausted`].
pub async fn geocode_batch(
    queries: &[String],
    backends: Vec<Arc<dyn Geocoder>>,
    max_parallel: usize,
    retry_limit: u32,
    inter_call_delay: Duration,
) -> Result<Vec<LookupResult>, ConfigError> {
    let config = BatchConfig::new(max_parallel, retry_limit, inter_call_delay);
    let batch = BatchGeocoder::new(backends, config)?;
    Ok(batch.run(queries).await)
}

/// Tally of a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub resolved: usize,
    pub exhausted: usize,
    pub blank: usize,
    /// Resolved queries per backend name.
    pub by_backend: BTreeMap<String, usize>,
}

impl BatchSummary {
    pub fn from_results(results: &[LookupResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for r in results {
            match r.outcome {
                LookupOutcome::Resolved => {
                    summary.resolved += 1;
                    if let Some(b) = &r.backend {
                        *summary.by_backend.entry(b.clone()).or_default() += 1;
                    }
                }
                LookupOutcome::Exhausted => summary.exhausted += 1,
                LookupOutcome::Blank => summary.blank += 1,
            }
        }
        summary
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} queries: {} resolved, {} exhausted, {} blank",
            self.total, self.resolved, self.exhausted, self.blank
        )
    }
}
