//! Cache Statistics Module
//!
//! Tracks cache performance metrics including requests, hits, misses, and
//! evictions. Counters are atomics so concurrent callers never contend on a
//! lock just to record a hit.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Live, internally synchronized cache counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    total_requests: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    /// Counts one lookup that found a live entry.
    pub fn record_hit(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Miss ==
    /// Counts one lookup that found nothing (or an expired entry).
    pub fn record_miss(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Evictions ==
    /// Adds `count` removed entries to the eviction counter.
    pub fn record_evictions(&self, count: usize) {
        if count > 0 {
            self.evictions.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    // == Reset ==
    /// Zeroes every counter.
    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Captures the counters together with the store's size figures.
    pub fn snapshot(&self, current_size: usize, max_size: usize) -> StatsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let hits = self.hits.load(Ordering::Relaxed);

        StatsSnapshot {
            total_requests,
            hits,
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            current_size,
            max_size,
            hit_rate: hit_rate(hits, total_requests),
        }
    }
}

/// Returns hits / total_requests, or 0.0 if no requests have been made.
fn hit_rate(hits: u64, total_requests: u64) -> f64 {
    if total_requests == 0 {
        0.0
    } else {
        hits as f64 / total_requests as f64
    }
}

// == Stats Snapshot ==
/// Point-in-time copy of the cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub current_size: usize,
    pub max_size: usize,
    pub hit_rate: f64,
}
