//! Counters describing how requests were served.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of cache activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Calls that skipped the cache (disabled or `skip_cache`).
    pub bypasses: u64,
    pub refreshes_started: u64,
    /// Refresh requests dropped because one was already in flight.
    pub refreshes_coalesced: u64,
    pub refresh_failures: u64,
    pub storage_failures: u64,
}

impl CacheStats {
    /// Fraction of cacheable calls served from the store.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.hits as f64 / total as f64;
        ratio
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    bypasses: AtomicU64,
    refreshes_started: AtomicU64,
    refreshes_coalesced: AtomicU64,
    refresh_failures: AtomicU64,
    storage_failures: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn bypass(&self) {
        self.bypasses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn refresh_started(&self) {
        self.refreshes_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn refresh_coalesced(&self) {
        self.refreshes_coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn refresh_failed(&self) {
        self.refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn storage_failed(&self) {
        self.storage_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            bypasses: self.bypasses.load(Ordering::Relaxed),
            refreshes_started: self.refreshes_started.load(Ordering::Relaxed),
            refreshes_coalesced: self.refreshes_coalesced.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
            storage_failures: self.storage_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_ratio() {
        assert!(CacheStats::default().hit_ratio().abs() < f64::EPSILON);

        let counters = StatsCounters::default();
        counters.hit();
        counters.hit();
        counters.hit();
        counters.miss();
        counters.bypass();
        let stats = counters.snapshot();
        assert!((stats.hit_ratio() - 0.75).abs() < f64::EPSILON);
        assert_eq!(stats.bypasses, 1);
    }
}
