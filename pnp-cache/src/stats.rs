use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters exposed for the `/api/v1/status` surface (spec §4.G).
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inflight_coalesced: AtomicU64,
    invalidations_by_category: [AtomicU64; 6],
}

impl CacheStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_coalesced(&self) {
        self.inflight_coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self, category_index: usize) {
        self.invalidations_by_category[category_index].fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inflight_coalesced: self.inflight_coalesced.load(Ordering::Relaxed),
            invalidations_by_category: std::array::from_fn(|i| self.invalidations_by_category[i].load(Ordering::Relaxed)),
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub inflight_coalesced: u64,
    pub invalidations_by_category: [u64; 6],
}
