//! Fleet Cache - in-process caching and resilient execution
//!
//! A concurrent key/value cache with TTL expiration, LRU capacity eviction,
//! tag and pattern invalidation, statistics and single-flight miss
//! resolution, plus retry-with-backoff and bounded-concurrency batches for
//! the slow operations the cache fronts.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod resilience;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheStore, EntryOptions, StatsSnapshot};
pub use config::Config;
pub use error::{CacheError, Result};
pub use resilience::{parallel_map, retry_async, run_batch, ResilientExecutor, RetryPolicy};
pub use tasks::spawn_sweep_task;
