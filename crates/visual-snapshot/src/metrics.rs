use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{core::Collector, histogram_opts, Histogram, IntCounter, IntCounterVec, Registry};
use tracing::error;

use crate::models::SnapshotOutcome;

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotMetricsSnapshot {
    pub requests: u64,
    pub passed: u64,
    pub failed: u64,
    pub diff_persist_failures: u64,
}

static REQUESTS: AtomicU64 = AtomicU64::new(0);
static PASSED: AtomicU64 = AtomicU64::new(0);
static FAILED: AtomicU64 = AtomicU64::new(0);
static DIFF_PERSIST_FAILURES: AtomicU64 = AtomicU64::new(0);

lazy_static! {
    static ref SNAPSHOT_OUTCOMES_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new(
            "shotmatch_snapshot_outcomes_total",
            "Snapshot requests by outcome"
        ),
        &["outcome"]
    )
    .unwrap();
    static ref COMPARE_DURATION: Histogram = Histogram::with_opts(histogram_opts!(
        "shotmatch_compare_duration_seconds",
        "Pixel comparison latency",
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    ))
    .unwrap();
    static ref DIFF_PERSIST_FAILURES_TOTAL: IntCounter = IntCounter::new(
        "shotmatch_diff_persist_failures_total",
        "Diff artifacts that could not be written",
    )
    .unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register snapshot metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, SNAPSHOT_OUTCOMES_TOTAL.clone());
    register(registry, COMPARE_DURATION.clone());
    register(registry, DIFF_PERSIST_FAILURES_TOTAL.clone());
}

pub fn record_outcome(outcome: &SnapshotOutcome) {
    REQUESTS.fetch_add(1, Ordering::Relaxed);
    if outcome.passed() {
        PASSED.fetch_add(1, Ordering::Relaxed);
    } else {
        FAILED.fetch_add(1, Ordering::Relaxed);
    }
    SNAPSHOT_OUTCOMES_TOTAL
        .with_label_values(&[outcome.label()])
        .inc();
}

pub fn observe_compare(duration: Duration) {
    COMPARE_DURATION.observe(duration.as_secs_f64());
}

pub fn record_diff_persist_failure() {
    DIFF_PERSIST_FAILURES.fetch_add(1, Ordering::Relaxed);
    DIFF_PERSIST_FAILURES_TOTAL.inc();
}

pub fn snapshot() -> SnapshotMetricsSnapshot {
    SnapshotMetricsSnapshot {
        requests: REQUESTS.load(Ordering::Relaxed),
        passed: PASSED.load(Ordering::Relaxed),
        failed: FAILED.load(Ordering::Relaxed),
        diff_persist_failures: DIFF_PERSIST_FAILURES.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    REQUESTS.store(0, Ordering::Relaxed);
    PASSED.store(0, Ordering::Relaxed);
    FAILED.store(0, Ordering::Relaxed);
    DIFF_PERSIST_FAILURES.store(0, Ordering::Relaxed);
}
