//! Eviction Module
//!
//! Size-based LRU eviction and the time-based expiry sweep pass.
//!
//! Capacity eviction removes the least recently used fifth of the store in
//! one go, so an insert at the boundary does not trigger an eviction on every
//! subsequent insert.

use std::time::Instant;

use tracing::debug;

use crate::cache::CacheStore;

/// Share of the store removed by one capacity eviction pass.
pub const EVICTION_FRACTION: f64 = 0.2;

// == Eviction Count ==
/// Number of entries to evict from a store holding `len` entries.
///
/// `len * EVICTION_FRACTION` rounded, at least one, and at least enough to
/// bring the store back to `max_entries`.
pub fn eviction_count(len: usize, max_entries: usize) -> usize {
    let fraction = (len as f64 * EVICTION_FRACTION).round() as usize;
    fraction
        .max(1)
        .max(len.saturating_sub(max_entries))
        .min(len)
}

// == LRU Victims ==
/// Picks the `count` least recently used keys.
///
/// Ties on access time are broken by key order so the outcome is
/// deterministic.
pub fn lru_victims(mut candidates: Vec<(String, Instant)>, count: usize) -> Vec<String> {
    candidates.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    candidates.truncate(count);
    candidates.into_iter().map(|(key, _)| key).collect()
}

impl<V> CacheStore<V> {
    // == Evict LRU ==
    /// Evicts the least recently used entries if the store is over capacity.
    ///
    /// Returns the number of entries removed.
    pub(crate) fn evict_lru(&self) -> usize {
        let _pass = self.eviction_lock.lock();

        let len = self.entries.len();
        if len <= self.max_entries {
            return 0;
        }

        let candidates: Vec<(String, Instant)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().last_access_at))
            .collect();
        let victims = lru_victims(candidates, eviction_count(len, self.max_entries));

        let removed = victims
            .iter()
            .filter(|key| self.entries.remove(key.as_str()).is_some())
            .count();

        self.stats.record_evictions(removed);
        debug!(
            removed,
            len,
            max_entries = self.max_entries,
            "capacity eviction"
        );
        removed
    }

    // == Sweep Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.entries.retain(|_, entry| {
            let expired = entry.is_expired_at(now);
            if expired {
                removed += 1;
            }
            !expired
        });

        self.stats.record_evictions(removed);
        removed
    }
}
