use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Point-in-time copy of the execution counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Tasks served from the result cache.
    pub cache_hits: u64,
    /// Tasks that checked the cache and missed.
    pub cache_misses: u64,
    /// Tasks handed to an invoker at least once.
    pub tasks_dispatched: u64,
    /// Dispatched tasks that ultimately succeeded.
    pub tasks_succeeded: u64,
    /// Dispatched tasks that exhausted their retry budget.
    pub tasks_failed: u64,
    /// Individual retry attempts across all tasks.
    pub retries: u64,
    /// Tasks skipped because a category circuit was open.
    pub breaker_skips: u64,
    /// Tasks skipped because the cost budget was exhausted.
    pub budget_skips: u64,
}

/// Shared counters fed by the execution engine.
#[derive(Debug, Default)]
pub struct ExecutionMetrics {
    inner: Mutex<MetricsSnapshot>,
}

impl ExecutionMetrics {
    /// Create a zeroed counter block.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_cache_hit(&self) {
        self.inner.lock().cache_hits += 1;
    }

    pub(crate) fn record_cache_miss(&self) {
        self.inner.lock().cache_misses += 1;
    }

    pub(crate) fn record_dispatch(&self) {
        self.inner.lock().tasks_dispatched += 1;
    }

    pub(crate) fn record_success(&self) {
        self.inner.lock().tasks_succeeded += 1;
    }

    pub(crate) fn record_failure(&self) {
        self.inner.lock().tasks_failed += 1;
    }

    pub(crate) fn record_retry(&self) {
        self.inner.lock().retries += 1;
    }

    pub(crate) fn record_breaker_skip(&self) {
        self.inner.lock().breaker_skips += 1;
    }

    pub(crate) fn record_budget_skip(&self) {
        self.inner.lock().budget_skips += 1;
    }

    /// Copy out the current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().clone()
    }
}
