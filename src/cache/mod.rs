//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, LRU eviction, tag and
//! pattern invalidation, and single-flight miss resolution.

mod entry;
mod eviction;
mod guard;
mod invalidation;
mod stats;
mod store;


// Re-export public types
pub use entry::{CacheEntry, EntryInfo, EntryOptions, MAX_TTL};
pub use eviction::{eviction_count, lru_victims, EVICTION_FRACTION};
pub use guard::{KeyPermit, StampedeGuard};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::CacheStore;
