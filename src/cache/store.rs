//! Cache Store Module
//!
//! Main cache engine combining a concurrent map with TTL expiration, LRU
//! capacity eviction, statistics and single-flight miss resolution.
//!
//! The store is internally synchronized: every method takes `&self`, and the
//! intended sharing model is one `Arc<CacheStore<V>>` per process handed to
//! every service that needs it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::{
    CacheEntry, CacheStats, EntryInfo, EntryOptions, StampedeGuard, StatsSnapshot, MAX_TTL,
};
use crate::error::{BoxError, CacheError, Result};
use crate::tasks::{spawn_sweep_task, SweepHandle};

// == Cache Store ==
/// Concurrent cache storage with TTL, LRU eviction and stampede protection.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    pub(crate) entries: DashMap<String, CacheEntry<V>>,
    /// Performance statistics
    pub(crate) stats: CacheStats,
    /// Per-key single-flight registry
    guard: StampedeGuard,
    /// Serializes capacity eviction passes
    pub(crate) eviction_lock: Mutex<()>,
    /// Soft capacity; exceeding it triggers LRU eviction
    pub(crate) max_entries: usize,
    /// TTL for entries inserted without an explicit one
    default_ttl: Duration,
    /// Background expiry sweep, present when started with [`CacheStore::start`]
    sweeper: Mutex<Option<SweepHandle>>,
}

impl<V> CacheStore<V>
where
    V: Clone,
{
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default TTL.
    ///
    /// No background sweep runs; expired entries are still never returned
    /// because lookups expire lazily.
    ///
    /// # Arguments
    /// * `max_entries` - Soft capacity, must be positive
    /// * `default_ttl` - TTL for entries without an explicit one, must be positive
    pub fn new(max_entries: usize, default_ttl: Duration) -> Result<Self> {
        if max_entries == 0 {
            return Err(CacheError::InvalidArgument(
                "max_entries must be positive".to_string(),
            ));
        }
        validate_ttl(default_ttl)?;

        Ok(Self {
            entries: DashMap::new(),
            stats: CacheStats::new(),
            guard: StampedeGuard::new(),
            eviction_lock: Mutex::new(()),
            max_entries,
            default_ttl,
            sweeper: Mutex::new(None),
        })
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired entries are removed on the spot, counted as an eviction and
    /// reported as a miss.
    pub fn get(&self, key: &str) -> Result<Option<V>> {
        validate_key(key)?;

        let value = self.lookup(key);
        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        Ok(value)
    }

    /// Retrieves a value together with its metadata in one map access.
    ///
    /// Counts as a single read, exactly like [`get`](Self::get).
    pub fn get_with_info(&self, key: &str) -> Result<Option<(V, EntryInfo)>> {
        validate_key(key)?;

        let found = self.lookup_with(key, |entry| (entry.value.clone(), entry.info()));
        match found {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        Ok(found)
    }

    fn lookup(&self, key: &str) -> Option<V> {
        self.lookup_with(key, |entry| entry.value.clone())
    }

    /// Live-entry lookup that touches access metadata and expires lazily but
    /// leaves hit/miss accounting to the caller.
    fn lookup_with<R>(&self, key: &str, read: impl FnOnce(&CacheEntry<V>) -> R) -> Option<R> {
        let expired = match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired() => {
                entry.touch();
                return Some(read(entry.value()));
            }
            Some(_) => true,
            None => false,
        };

        if expired && self.entries.remove_if(key, |_, e| e.is_expired()).is_some() {
            self.stats.record_evictions(1);
            debug!(key, "expired entry removed on lookup");
        }
        None
    }

    // == Set ==
    /// Stores a key-value pair, replacing any existing entry.
    ///
    /// Uses `options.ttl` or the default TTL. When the insert pushes the
    /// store over capacity, the least recently used entries are evicted
    /// before this call returns.
    pub fn set(&self, key: impl Into<String>, value: V, options: EntryOptions) -> Result<()> {
        let key = key.into();
        validate_key(&key)?;

        let ttl = options.ttl.unwrap_or(self.default_ttl);
        validate_ttl(ttl)?;

        let tags = options
            .tags
            .into_iter()
            .filter(|tag| !tag.trim().is_empty())
            .collect();

        debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "storing cache entry");
        self.entries.insert(key, CacheEntry::new(value, ttl, tags));

        if self.entries.len() > self.max_entries {
            self.evict_lru();
        }

        Ok(())
    }

    // == Get Or Compute ==
    /// Returns the cached value or computes, stores and returns it.
    ///
    /// Concurrent callers missing on the same key are serialized so only one
    /// of them runs its factory; the others are served from the freshly
    /// stored entry. A factory error is returned to the caller that ran it
    /// and nothing is cached, so the next caller tries again.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        options: EntryOptions,
        factory: F,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        E: Into<BoxError>,
    {
        let never = CancellationToken::new();
        self.get_or_compute_cancellable(key, options, &never, factory)
            .await
    }

    /// [`get_or_compute`](Self::get_or_compute) that gives up with
    /// [`CacheError::Cancelled`] when `cancel` fires while waiting for the key
    /// or before the factory starts. Cancelling a waiter does not affect the
    /// caller currently computing the value.
    pub async fn get_or_compute_cancellable<F, Fut, E>(
        &self,
        key: &str,
        options: EntryOptions,
        cancel: &CancellationToken,
        factory: F,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        E: Into<BoxError>,
    {
        validate_key(key)?;
        // Reject before the factory runs, not after.
        validate_ttl(options.ttl.unwrap_or(self.default_ttl))?;

        if let Some(value) = self.lookup(key) {
            self.stats.record_hit();
            return Ok(value);
        }

        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CacheError::Cancelled),
            permit = self.guard.acquire(key) => permit,
        };

        // Another caller may have filled the key while we waited.
        if let Some(value) = self.lookup(key) {
            self.stats.record_hit();
            return Ok(value);
        }
        if cancel.is_cancelled() {
            return Err(CacheError::Cancelled);
        }

        self.stats.record_miss();
        debug!(key, "computing value for cache miss");
        let value = factory().await.map_err(CacheError::computation)?;
        self.set(key, value.clone(), options)?;

        Ok(value)
    }
}

impl<V> CacheStore<V> {
    // == Remove ==
    /// Removes an entry by key. Removing an absent key is a no-op.
    ///
    /// Returns whether an entry was present.
    pub fn remove(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.entries.remove(key).is_some())
    }

    // == Clear ==
    /// Removes every entry, counting each one as an eviction.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, _| {
            removed += 1;
            false
        });

        self.stats.record_evictions(removed);
        info!(removed, "cache cleared");
        removed
    }

    /// Returns true if a live entry exists for `key`, without touching it.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    /// Metadata for a live entry, without touching recency or statistics.
    pub fn entry_info(&self, key: &str) -> Result<Option<EntryInfo>> {
        validate_key(key)?;
        Ok(self
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.info()))
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn statistics(&self) -> StatsSnapshot {
        self.stats.snapshot(self.entries.len(), self.max_entries)
    }

    /// Zeroes the request, hit, miss and eviction counters.
    pub fn reset_statistics(&self) {
        self.stats.reset();
        info!("cache statistics reset");
    }

    // == Length ==
    /// Returns the current number of entries, including expired ones that
    /// have not been swept yet.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Shutdown ==
    /// Stops the background sweep, if one is running. Idempotent.
    pub fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.stop();
            info!("cache store shut down");
        }
    }

    /// Returns true while a background sweep task is attached.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl<V> CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Start ==
    /// Creates a shared store and starts its expiry sweep.
    ///
    /// The sweep lives as long as the store: it stops on
    /// [`shutdown`](Self::shutdown) or when the last `Arc` is dropped.
    /// Must be called from within a Tokio runtime.
    pub fn start(
        max_entries: usize,
        default_ttl: Duration,
        sweep_interval: Duration,
    ) -> Result<Arc<Self>> {
        if sweep_interval.is_zero() || sweep_interval > MAX_TTL {
            return Err(CacheError::InvalidArgument(format!(
                "sweep interval must be positive and at most {} seconds",
                MAX_TTL.as_secs()
            )));
        }

        let store = Arc::new(Self::new(max_entries, default_ttl)?);
        let handle = spawn_sweep_task(Arc::downgrade(&store), sweep_interval);
        *store.sweeper.lock() = Some(handle);

        info!(
            max_entries,
            default_ttl_secs = default_ttl.as_secs(),
            sweep_interval_secs = sweep_interval.as_secs(),
            "cache store started"
        );
        Ok(store)
    }
}

// == Validation ==
fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(CacheError::InvalidArgument(
            "key cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_ttl(ttl: Duration) -> Result<()> {
    if ttl.is_zero() {
        return Err(CacheError::InvalidArgument("ttl must be positive".to_string()));
    }
    if ttl > MAX_TTL {
        return Err(CacheError::InvalidArgument(format!(
            "ttl must not exceed {} seconds",
            MAX_TTL.as_secs()
        )));
    }
    Ok(())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::sleep;

    fn store(max_entries: usize) -> CacheStore<String> {
        CacheStore::new(max_entries, Duration::from_secs(300)).unwrap()
    }

    fn put(store: &CacheStore<String>, key: &str, value: &str) {
        store
            .set(key, value.to_string(), EntryOptions::default())
            .unwrap();
    }

    #[test]
    fn test_store_new() {
        let store = store(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.max_entries(), 100);
    }

    #[test]
    fn test_store_new_rejects_invalid_limits() {
        assert!(matches!(
            CacheStore::<String>::new(0, Duration::from_secs(1)),
            Err(CacheError::InvalidArgument(_))
        ));
        assert!(matches!(
            CacheStore::<String>::new(10, Duration::ZERO),
            Err(CacheError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_store_set_and_get() {
        let store = store(100);

        put(&store, "key1", "value1");
        let value = store.get("key1").unwrap();

        assert_eq!(value.as_deref(), Some("value1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent_counts_miss() {
        let store = store(100);

        assert_eq!(store.get("nonexistent").unwrap(), None);

        let stats = store.statistics();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_requests, 1);
    }

    #[test]
    fn test_store_blank_key_rejected() {
        let store = store(100);

        assert!(matches!(store.get("  "), Err(CacheError::InvalidArgument(_))));
        assert!(matches!(
            store.set("", "v".to_string(), EntryOptions::default()),
            Err(CacheError::InvalidArgument(_))
        ));
        assert!(matches!(store.remove(""), Err(CacheError::InvalidArgument(_))));
        assert_eq!(store.statistics().total_requests, 0);
    }

    #[test]
    fn test_store_remove_is_idempotent() {
        let store = store(100);

        put(&store, "key1", "value1");
        assert!(store.remove("key1").unwrap());
        assert!(!store.remove("key1").unwrap());

        assert!(store.is_empty());
        assert_eq!(store.get("key1").unwrap(), None);
    }

    #[test]
    fn test_store_overwrite() {
        let store = store(100);

        put(&store, "key1", "value1");
        put(&store, "key1", "value2");

        assert_eq!(store.get("key1").unwrap().as_deref(), Some("value2"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_ttl_expiration_counts_eviction() {
        let store = store(100);

        store
            .set(
                "key1",
                "value1".to_string(),
                EntryOptions::new().ttl(Duration::from_millis(50)),
            )
            .unwrap();
        assert!(store.get("key1").unwrap().is_some());

        sleep(Duration::from_millis(80));

        assert_eq!(store.get("key1").unwrap(), None);
        assert_eq!(store.len(), 0);

        let stats = store.statistics();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
    }

    #[test]
    fn test_store_zero_ttl_rejected() {
        let store = store(100);
        let result = store.set("k", "v".to_string(), EntryOptions::new().ttl(Duration::ZERO));
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
    }

    #[test]
    fn test_default_value_is_a_hit() {
        let store: CacheStore<u32> = CacheStore::new(10, Duration::from_secs(60)).unwrap();

        store.set("zero", 0, EntryOptions::default()).unwrap();

        assert_eq!(store.get("zero").unwrap(), Some(0));
        assert_eq!(store.statistics().hits, 1);
    }

    #[test]
    fn test_store_lru_eviction_on_overflow() {
        let store = store(3);

        put(&store, "key1", "value1");
        sleep(Duration::from_millis(2));
        put(&store, "key2", "value2");
        sleep(Duration::from_millis(2));
        put(&store, "key3", "value3");
        sleep(Duration::from_millis(2));

        // Over capacity by one: 20% of 4 rounds to 1, key1 is the oldest
        put(&store, "key4", "value4");

        assert_eq!(store.len(), 3);
        assert!(!store.contains_key("key1"));
        assert!(store.contains_key("key2"));
        assert!(store.contains_key("key4"));
        assert_eq!(store.statistics().evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let store = store(3);

        put(&store, "key1", "value1");
        sleep(Duration::from_millis(2));
        put(&store, "key2", "value2");
        sleep(Duration::from_millis(2));
        put(&store, "key3", "value3");
        sleep(Duration::from_millis(2));

        // Access key1 to make it most recently used
        store.get("key1").unwrap();
        sleep(Duration::from_millis(2));

        put(&store, "key4", "value4");

        assert!(store.contains_key("key1"));
        assert!(!store.contains_key("key2"));
    }

    #[test]
    fn test_store_clear_twice() {
        let store = store(100);
        put(&store, "a", "1");
        put(&store, "b", "2");
        store.get("a").unwrap();

        assert_eq!(store.clear(), 2);
        assert_eq!(store.clear(), 0);

        let stats = store.statistics();
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.current_size, 0);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn test_entry_info_does_not_touch() {
        let store = store(100);
        store
            .set("k", "v".to_string(), EntryOptions::new().tags(["fleet"]))
            .unwrap();

        let info = store.entry_info("k").unwrap().unwrap();
        assert_eq!(info.access_count, 0);
        assert_eq!(info.tags, vec!["fleet".to_string()]);
        assert_eq!(store.statistics().total_requests, 0);
        assert!(store.entry_info("missing").unwrap().is_none());
    }

    #[test]
    fn test_reset_statistics() {
        let store = store(100);
        put(&store, "k", "v");
        store.get("k").unwrap();
        store.get("other").unwrap();

        store.reset_statistics();

        let stats = store.statistics();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.current_size, 1);
    }

    #[tokio::test]
    async fn test_get_or_compute_caches_result() {
        let store = store(100);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = store
                .get_or_compute("plate:ABC1234", EntryOptions::default(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CacheError>("Fiat Uno".to_string())
                })
                .await
                .unwrap();
            assert_eq!(value, "Fiat Uno");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = store.statistics();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
    }

    #[tokio::test]
    async fn test_get_or_compute_error_leaves_no_entry() {
        let store = store(100);

        let result = store
            .get_or_compute("k", EntryOptions::default(), || async {
                Err::<String, _>(anyhow::anyhow!("backend unavailable"))
            })
            .await;
        assert!(matches!(result, Err(CacheError::ComputationFailed(_))));
        assert!(store.is_empty());

        let value = store
            .get_or_compute("k", EntryOptions::default(), || async {
                Ok::<_, CacheError>("recovered".to_string())
            })
            .await
            .unwrap();
        assert_eq!(value, "recovered");
    }

    #[tokio::test]
    async fn test_get_or_compute_cancelled_before_start() {
        let store = store(100);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = store
            .get_or_compute_cancellable("k", EntryOptions::default(), &cancel, || async {
                Ok::<_, CacheError>("never".to_string())
            })
            .await;

        assert!(matches!(result, Err(CacheError::Cancelled)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_huge_ttl_rejected() {
        let store = store(100);

        let result = store.set("k", "v".to_string(), EntryOptions::new().ttl(Duration::MAX));
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));

        let result = store.set("k", "v".to_string(), EntryOptions::new().ttl(MAX_TTL));
        assert!(result.is_ok());
        assert!(store.contains_key("k"));

        assert!(matches!(
            CacheStore::<String>::new(10, Duration::from_secs(u64::MAX)),
            Err(CacheError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_get_with_info_single_read() {
        let store = store(100);
        store
            .set("k", "v".to_string(), EntryOptions::new().tags(["fleet"]))
            .unwrap();

        let (value, info) = store.get_with_info("k").unwrap().unwrap();
        assert_eq!(value, "v");
        assert_eq!(info.access_count, 1);
        assert_eq!(info.tags, vec!["fleet".to_string()]);
        assert!(store.get_with_info("missing").unwrap().is_none());

        let stats = store.statistics();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_get_or_compute_invalid_ttl_skips_factory() {
        let store = store(100);
        let calls = AtomicUsize::new(0);

        for ttl in [Duration::ZERO, Duration::MAX] {
            let result = store
                .get_or_compute("k", EntryOptions::new().ttl(ttl), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CacheError>("computed".to_string())
                })
                .await;
            assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(store.is_empty());
        assert_eq!(store.statistics().total_requests, 0);
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let store: Arc<CacheStore<String>> =
            CacheStore::start(10, Duration::from_secs(60), Duration::from_secs(1)).unwrap();
        assert!(store.is_sweeping());

        store.shutdown();
        store.shutdown();
        assert!(!store.is_sweeping());
    }

    #[tokio::test]
    async fn test_start_rejects_out_of_range_interval() {
        let result =
            CacheStore::<String>::start(10, Duration::from_secs(60), Duration::ZERO);
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));

        let result =
            CacheStore::<String>::start(10, Duration::from_secs(60), Duration::MAX);
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
    }
}
