//! Pipeline counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Atomic counters shared across all pipeline runs
#[derive(Clone)]
pub struct PipelineStats {
    inner: Arc<StatsInner>,
}

struct StatsInner {
    total_requests: AtomicU64,
    tier1_handled: AtomicU64,
    tier2_handled: AtomicU64,
    tier3_handled: AtomicU64,
    cache_hits: AtomicU64,
    degraded_defaults: AtomicU64,
    verifier_timeouts: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StatsInner {
                total_requests: AtomicU64::new(0),
                tier1_handled: AtomicU64::new(0),
                tier2_handled: AtomicU64::new(0),
                tier3_handled: AtomicU64::new(0),
                cache_hits: AtomicU64::new(0),
                degraded_defaults: AtomicU64::new(0),
                verifier_timeouts: AtomicU64::new(0),
            }),
        }
    }

    pub fn record_request(&self) {
        self.inner.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Count the tier that produced the final answer
    pub fn record_tier(&self, tier: u8) {
        let counter = match tier {
            1 => &self.inner.tier1_handled,
            2 => &self.inner.tier2_handled,
            _ => &self.inner.tier3_handled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_degraded_default(&self) {
        self.inner.degraded_defaults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_verifier_timeout(&self) {
        self.inner.verifier_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_requests: self.inner.total_requests.load(Ordering::Relaxed),
            tier1_handled: self.inner.tier1_handled.load(Ordering::Relaxed),
            tier2_handled: self.inner.tier2_handled.load(Ordering::Relaxed),
            tier3_handled: self.inner.tier3_handled.load(Ordering::Relaxed),
            cache_hits: self.inner.cache_hits.load(Ordering::Relaxed),
            degraded_defaults: self.inner.degraded_defaults.load(Ordering::Relaxed),
            verifier_timeouts: self.inner.verifier_timeouts.load(Ordering::Relaxed),
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the pipeline counters
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub tier1_handled: u64,
    pub tier2_handled: u64,
    pub tier3_handled: u64,
    pub cache_hits: u64,
    pub degraded_defaults: u64,
    pub verifier_timeouts: u64,
}

impl StatsSnapshot {
    /// Share of requests the given counter accounts for, as a percentage
    pub fn percentage(&self, count: u64) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total_requests as f64
        }
    }
}
