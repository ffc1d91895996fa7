use std::sync::Arc;
use std::sync::atomic::AtomicU64;

/// Minimal counters for operational visibility.
///
/// This is the observability sink for the ingestion path: dropped ticks are
/// counted here (and logged) instead of being raised.
#[derive(Clone, Default)]
pub struct Counters {
    pub ticks_applied: Arc<AtomicU64>,
    pub ticks_malformed: Arc<AtomicU64>,
    pub ticks_stale: Arc<AtomicU64>,

    pub baseline_rows: Arc<AtomicU64>,
    pub snapshots_published: Arc<AtomicU64>,
}
