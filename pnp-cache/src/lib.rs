//! In-memory, category-tagged, TTL-bounded cache of controller-observed
//! state, with at-most-one concurrent refill per key.

mod category;
mod stats;

pub use category::{Category, CategoryTtls};
pub use stats::{CacheStats, CacheStatsSnapshot};

use dashmap::DashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::Notify;

struct Entry<V> {
    value: V,
    category: Category,
    expires_at: Instant,
}

/// First caller for a cold key becomes the leader and runs the refiller;
/// later callers for the same key await this slot instead of re-querying
/// the controller (spec §4.G, "at-most-one concurrent refill per key").
struct RefillSlot<V> {
    notify: Notify,
    result: Mutex<Option<Result<V, String>>>,
}

impl<V> RefillSlot<V> {
    fn new() -> Self {
        Self { notify: Notify::new(), result: Mutex::new(None) }
    }
}

/// Key→value store with categories, TTL, single-flight refill, and coherent
/// category invalidation (spec §4.G). A single mutex-free `DashMap` guards
/// the entries; the `inflight` map tracks in-progress refills separately so
/// refillers never run while holding a lock over the entries themselves.
pub struct StateCache<V: Clone + Send + Sync + 'static> {
    entries: DashMap<String, Entry<V>>,
    inflight: DashMap<String, Arc<RefillSlot<V>>>,
    ttls: CategoryTtls,
    stats: CacheStats,
}

impl<V: Clone + Send + Sync + 'static> StateCache<V> {
    pub fn new(ttls: CategoryTtls) -> Self {
        Self {
            entries: DashMap::new(),
            inflight: DashMap::new(),
            ttls,
            stats: CacheStats::default(),
        }
    }

    /// Returns a fresh value, refilling at most once per key among any
    /// number of concurrent callers (spec property §8.4).
    ///
    /// `refiller` errors are flattened to `String` since the leader's result
    /// must be `Clone` to hand to every waiter; callers reconstruct their
    /// typed error from the message if needed.
    pub async fn get<F, Fut>(&self, key: &str, category: Category, refiller: F) -> Result<V, String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, String>>,
    {
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > Instant::now() {
                self.stats.record_hit();
                return Ok(entry.value.clone());
            }
        }
        self.stats.record_miss();

        let (slot, is_leader) = match self.inflight.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(o) => (o.get().clone(), false),
            dashmap::mapref::entry::Entry::Vacant(v) => {
                let slot = Arc::new(RefillSlot::new());
                v.insert(slot.clone());
                (slot, true)
            }
        };

        if !is_leader {
            self.stats.record_coalesced();
            loop {
                {
                    let guard = slot.result.lock().expect("refill slot mutex poisoned");
                    if let Some(result) = guard.as_ref() {
                        return result.clone();
                    }
                }
                slot.notify.notified().await;
            }
        }

        let outcome = refiller().await;
        match &outcome {
            Ok(value) => {
                self.entries.insert(
                    key.to_string(),
                    Entry { value: value.clone(), category, expires_at: Instant::now() + self.ttls.ttl_for(category) },
                );
            }
            Err(_) => {}
        }
        *slot.result.lock().expect("refill slot mutex poisoned") = Some(outcome.clone());
        slot.notify.notify_waiters();
        self.inflight.remove(key);
        outcome
    }

    pub fn set(&self, key: impl Into<String>, category: Category, value: V) {
        let ttl = self.ttls.ttl_for(category);
        self.entries.insert(key.into(), Entry { value, category, expires_at: Instant::now() + ttl });
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn invalidate_category(&self, category: Category) {
        self.entries.retain(|_, entry| entry.category != category);
        self.stats.record_invalidation(Category::ALL.iter().position(|c| *c == category).unwrap());
    }

    pub fn invalidate_all(&self) {
        for category in Category::ALL {
            self.invalidate_category(category);
        }
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn fresh_hit_does_not_invoke_refiller() {
        let cache: StateCache<i32> = StateCache::new(CategoryTtls::default());
        cache.set("k", Category::System, 42);
        let value = cache.get("k", Category::System, || async { panic!("refiller should not run") }).await.unwrap();
        assert_eq!(value, 42);
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn cold_key_invokes_refiller_once() {
        let cache: StateCache<i32> = StateCache::new(CategoryTtls::default());
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let value = cache
            .get("k", Category::System, || async move {
                calls2.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_misses_on_the_same_key_refill_exactly_once() {
        let cache: Arc<StateCache<i32>> = Arc::new(StateCache::new(CategoryTtls::default()));
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get("shared", Category::Positions, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(99)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 99);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_refill_is_not_cached() {
        let cache: StateCache<i32> = StateCache::new(CategoryTtls::default());
        let first = cache.get("k", Category::System, || async { Err("boom".to_string()) }).await;
        assert!(first.is_err());
        let second = cache.get("k", Category::System, || async { Ok(5) }).await;
        assert_eq!(second.unwrap(), 5);
    }

    #[tokio::test]
    async fn expired_entry_is_treated_as_a_miss() {
        let mut ttls = CategoryTtls::default();
        ttls.system = Duration::from_millis(1);
        let cache: StateCache<i32> = StateCache::new(ttls);
        cache.set("k", Category::System, 1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let value = cache.get("k", Category::System, || async { Ok(2) }).await.unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn category_invalidation_only_removes_matching_entries() {
        let cache: StateCache<i32> = StateCache::new(CategoryTtls::default());
        cache.set("pos", Category::Positions, 1);
        cache.set("sys", Category::System, 2);
        cache.invalidate_category(Category::Positions);
        assert!(cache.get("pos", Category::Positions, || async { Ok(99) }).await.is_ok());
        assert_eq!(cache.stats().invalidations_by_category[0], 1);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn invalidate_all_empties_every_category() {
        let cache: StateCache<i32> = StateCache::new(CategoryTtls::default());
        for category in Category::ALL {
            cache.set(category.as_str(), category, 1);
        }
        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
