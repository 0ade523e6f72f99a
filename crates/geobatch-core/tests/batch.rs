//! End-to-end batch behaviour against scripted in-memory backends.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use geobatch_core::{
    geocode_batch, BatchConfig, BatchGeocoder, BatchSummary, ConfigError, Coordinate,
    GeocodeError, Geocoder, LookupOutcome,
};

/// Replays scripted responses per query; falls back to `default` once a
/// script runs dry. Records every call.
struct Scripted {
    name: String,
    scripts: Mutex<HashMap<String, Vec<Result<Option<Coordinate>, GeocodeError>>>>,
    default: fn(&str) -> Result<Option<Coordinate>, GeocodeError>,
    delay: fn(&str) -> Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl Scripted {
    fn new(name: &str, default: fn(&str) -> Result<Option<Coordinate>, GeocodeError>) -> Self {
        Self {
            name: name.to_string(),
            scripts: Mutex::new(HashMap::new()),
            default,
            delay: |_| Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: fn(&str) -> Duration) -> Self {
        self.delay = delay;
        self
    }

    fn script(self, query: &str, responses: Vec<Result<Option<Coordinate>, GeocodeError>>) -> Self {
        self.scripts.lock().unwrap().insert(query.to_string(), responses);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_for(&self, query: &str) -> usize {
        self.calls().iter().filter(|q| q.as_str() == query).count()
    }
}

#[async_trait]
impl Geocoder for Scripted {
    async fn resolve(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError> {
        self.calls.lock().unwrap().push(query.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = (self.delay)(query);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let scripted = {
            let mut scripts = self.scripts.lock().unwrap();
            scripts
                .get_mut(query)
                .filter(|s| !s.is_empty())
                .map(|s| s.remove(0))
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        scripted.unwrap_or_else(|| (self.default)(query))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn dyns(backends: &[&Arc<Scripted>]) -> Vec<Arc<dyn Geocoder>> {
    backends
        .iter()
        .map(|b| Arc::clone(*b) as Arc<dyn Geocoder>)
        .collect()
}

fn coord_for(query: &str) -> Coordinate {
    // Stable per-query coordinate so order mistakes are visible.
    let n = query.bytes().map(u32::from).sum::<u32>() % 80;
    Coordinate::new(n as f64, -(n as f64)).unwrap()
}

fn resolves(query: &str) -> Result<Option<Coordinate>, GeocodeError> {
    Ok(Some(coord_for(query)))
}

fn not_found(_: &str) -> Result<Option<Coordinate>, GeocodeError> {
    Ok(None)
}

fn times_out(_: &str) -> Result<Option<Coordinate>, GeocodeError> {
    Err(GeocodeError::Timeout { ms: 5 })
}

fn rejected(_: &str) -> Result<Option<Coordinate>, GeocodeError> {
    Err(GeocodeError::Rejected {
        provider: "primary".into(),
        reason: "REQUEST_DENIED".into(),
    })
}

fn fast(max_parallel: usize, retry_limit: u32) -> BatchConfig {
    BatchConfig::new(max_parallel, retry_limit, Duration::ZERO).with_backoff(Duration::from_millis(1))
}

fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("Institute {i}")).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn output_matches_input_order_despite_scrambled_latency() {
    // Later queries finish first.
    let backend = Arc::new(Scripted::new("fixed", resolves).with_delay(|q| {
        let i: u64 = q.trim_start_matches("Institute ").parse().unwrap_or(0);
        Duration::from_millis(5 * (12 - i.min(12)))
    }));
    let queries = names(12);
    let out = BatchGeocoder::new(dyns(&[&backend]), fast(6, 0))
        .unwrap()
        .run(&queries)
        .await;

    assert_eq!(out.len(), queries.len());
    for (i, r) in out.iter().enumerate() {
        assert_eq!(r.index, i);
        assert_eq!(r.query, queries[i]);
        assert_eq!(r.coordinate, Some(coord_for(&queries[i])));
        assert_eq!(r.backend.as_deref(), Some("fixed"));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn not_found_walks_chain_in_order_then_exhausts() {
    let first = Arc::new(Scripted::new("first", not_found));
    let second = Arc::new(Scripted::new("second", not_found));
    let third = Arc::new(Scripted::new("third", not_found));
    let queries = vec!["Atlantis Polytechnic".to_string()];

    let out = BatchGeocoder::new(dyns(&[&first, &second, &third]), fast(1, 3))
        .unwrap()
        .run(&queries)
        .await;

    assert_eq!(out[0].outcome, LookupOutcome::Exhausted);
    assert_eq!(out[0].coordinate, None);
    assert_eq!(out[0].attempts, 3);
    // NotFound is never retried.
    assert_eq!(first.calls().len(), 1);
    assert_eq!(second.calls().len(), 1);
    assert_eq!(third.calls().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn transient_failures_retried_exactly_retry_limit_times() {
    let retry_limit = 2u32;
    let q = "Temple University";

    // retry_limit failures, then success: stays on the primary.
    let primary = Arc::new(
        Scripted::new("primary", resolves).script(q, vec![times_out(q), times_out(q)]),
    );
    let secondary = Arc::new(Scripted::new("secondary", resolves));
    let out = BatchGeocoder::new(dyns(&[&primary, &secondary]), fast(1, retry_limit))
        .unwrap()
        .run(&[q.to_string()])
        .await;
    assert_eq!(out[0].backend.as_deref(), Some("primary"));
    assert_eq!(primary.calls_for(q), (retry_limit + 1) as usize);
    assert!(secondary.calls().is_empty());

    // One more failure than that: falls through.
    let primary = Arc::new(Scripted::new("primary", times_out));
    let secondary = Arc::new(Scripted::new("secondary", resolves));
    let out = BatchGeocoder::new(dyns(&[&primary, &secondary]), fast(1, retry_limit))
        .unwrap()
        .run(&[q.to_string()])
        .await;
    assert_eq!(out[0].backend.as_deref(), Some("secondary"));
    assert_eq!(primary.calls_for(q), (retry_limit + 1) as usize);
    assert_eq!(secondary.calls_for(q), 1);
    assert_eq!(out[0].attempts, retry_limit + 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn permanent_failure_falls_through_after_one_call() {
    let primary = Arc::new(Scripted::new("primary", rejected));
    let secondary = Arc::new(Scripted::new("secondary", resolves));
    let out = BatchGeocoder::new(dyns(&[&primary, &secondary]), fast(2, 5))
        .unwrap()
        .run(&names(3))
        .await;

    assert!(out.iter().all(|r| r.backend.as_deref() == Some("secondary")));
    assert_eq!(primary.calls().len(), 3);
    assert_eq!(secondary.calls().len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallelism_does_not_change_results() {
    let queries = names(20);
    let run = |max_parallel: usize| {
        let queries = queries.clone();
        async move {
            let primary = Arc::new(Scripted::new("primary", |q| {
                if q.ends_with('3') || q.ends_with('7') {
                    Ok(None)
                } else {
                    resolves(q)
                }
            }));
            let secondary = Arc::new(Scripted::new("secondary", |q| {
                if q.ends_with('7') {
                    Ok(None)
                } else {
                    resolves(q)
                }
            }));
            BatchGeocoder::new(dyns(&[&primary, &secondary]), fast(max_parallel, 1))
                .unwrap()
                .run(&queries)
                .await
        }
    };

    let serial = run(1).await;
    let parallel = run(8).await;
    assert_eq!(serial, parallel);
    assert_eq!(
        serial.iter().filter(|r| r.backend.as_deref() == Some("secondary")).count(),
        2
    );
    assert_eq!(
        serial.iter().filter(|r| r.outcome == LookupOutcome::Exhausted).count(),
        2
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn blank_queries_never_reach_a_backend() {
    let backend = Arc::new(Scripted::new("fixed", resolves));
    let queries: Vec<String> = vec!["".into(), "MIT".into(), "   ".into(), "\t\n".into()];
    let out = geocode_batch(&queries, dyns(&[&backend]), 4, 2, Duration::ZERO)
        .await
        .unwrap();

    assert_eq!(out.len(), 4);
    assert_eq!(out[0].outcome, LookupOutcome::Blank);
    assert_eq!(out[1].outcome, LookupOutcome::Resolved);
    assert_eq!(out[2].outcome, LookupOutcome::Blank);
    assert_eq!(out[3].outcome, LookupOutcome::Blank);
    assert!(out.iter().filter(|r| r.outcome == LookupOutcome::Blank).all(|r| r.attempts == 0));
    assert_eq!(backend.calls(), vec!["MIT".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn queries_are_trimmed_before_dispatch() {
    let backend = Arc::new(Scripted::new("fixed", resolves));
    let out = geocode_batch(&["  Drexel University \n".to_string()], dyns(&[&backend]), 1, 0, Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(out[0].query, "Drexel University");
    assert_eq!(backend.calls(), vec!["Drexel University".to_string()]);
}

struct Panicky;

#[async_trait]
impl Geocoder for Panicky {
    async fn resolve(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError> {
        if query == "boom" {
            panic!("backend bug");
        }
        Ok(Some(coord_for(query)))
    }
    fn name(&self) -> &str {
        "panicky"
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn panicking_backend_only_affects_its_query() {
    let queries: Vec<String> = vec!["MIT".into(), "boom".into(), "Drexel".into()];
    let backends: Vec<Arc<dyn Geocoder>> = vec![Arc::new(Panicky) as Arc<dyn Geocoder>];
    let out = geocode_batch(&queries, backends, 3, 0, Duration::ZERO)
        .await
        .unwrap();

    assert_eq!(out.len(), 3);
    assert_eq!(out[0].outcome, LookupOutcome::Resolved);
    assert_eq!(out[1].outcome, LookupOutcome::Exhausted);
    assert_eq!(out[1].query, "boom");
    assert_eq!(out[1].index, 1);
    assert_eq!(out[1].attempts, 1);
    assert_eq!(out[2].outcome, LookupOutcome::Resolved);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn panicked_slot_counts_calls_made_before_the_panic() {
    let first = Arc::new(Scripted::new("first", not_found));
    let mut backends = dyns(&[&first]);
    backends.push(Arc::new(Panicky) as Arc<dyn Geocoder>);

    let out = geocode_batch(&["boom".to_string()], backends, 1, 2, Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(out[0].outcome, LookupOutcome::Exhausted);
    // One NotFound on the first backend, then the call that panicked.
    assert_eq!(out[0].attempts, 2);
    assert_eq!(first.calls_for("boom"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unbounded_max_parallel_runs_every_query() {
    let backend = Arc::new(Scripted::new("fixed", resolves));
    let queries = names(5);
    let out = geocode_batch(&queries, dyns(&[&backend]), usize::MAX, 0, Duration::ZERO)
        .await
        .unwrap();

    assert_eq!(out.len(), 5);
    assert!(out.iter().all(|r| r.outcome == LookupOutcome::Resolved));
    assert_eq!(backend.calls().len(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_never_exceeds_max_parallel() {
    let backend = Arc::new(
        Scripted::new("slow", resolves).with_delay(|_| Duration::from_millis(15)),
    );
    BatchGeocoder::new(dyns(&[&backend]), fast(3, 0))
        .unwrap()
        .run(&names(15))
        .await;
    let peak = backend.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak in-flight {peak} > 3");
    assert!(peak >= 2, "expected some overlap, got {peak}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exhausted_queries_do_not_abort_the_batch() {
    let backend = Arc::new(Scripted::new("flaky", resolves).script("Nowhere", vec![
        times_out("Nowhere"),
        times_out("Nowhere"),
    ]));
    let queries: Vec<String> = vec!["MIT".into(), "Nowhere".into(), "Drexel".into()];
    let out = BatchGeocoder::new(dyns(&[&backend]), fast(2, 1))
        .unwrap()
        .run(&queries)
        .await;

    let summary = BatchSummary::from_results(&out);
    assert_eq!(summary.resolved, 2);
    assert_eq!(summary.exhausted, 1);
    assert_eq!(out[1].attempts, 2);
}

#[tokio::test]
async fn configuration_errors_are_fatal() {
    let backend = Arc::new(Scripted::new("fixed", resolves));
    let err = geocode_batch(&names(2), vec![], 2, 1, Duration::ZERO)
        .await
        .unwrap_err();
    assert_eq!(err, ConfigError::NoBackends);

    let err = geocode_batch(&names(2), dyns(&[&backend]), 0, 1, Duration::ZERO)
        .await
        .unwrap_err();
    assert_eq!(err, ConfigError::ZeroParallelism);
    assert!(backend.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dropping_the_batch_aborts_in_flight_work() {
    let backend = Arc::new(
        Scripted::new("slow", resolves).with_delay(|_| Duration::from_millis(40)),
    );
    let batch = BatchGeocoder::new(dyns(&[&backend]), fast(2, 0)).unwrap();
    let queries = names(10);

    let timed_out = tokio::time::timeout(Duration::from_millis(60), batch.run(&queries)).await;
    assert!(timed_out.is_err());

    // Let any poll already in progress on another worker finish.
    tokio::time::sleep(Duration::from_millis(10)).await;
    let started = backend.calls().len();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(backend.calls().len(), started, "tasks kept running after drop");
    assert!(started < queries.len());
}
