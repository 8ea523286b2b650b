//! Stampede Guard Module
//!
//! Per-key async mutex registry. A handle exists only while some caller is
//! resolving (or waiting to resolve) a miss for that key.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

// == Stampede Guard ==
#[derive(Debug, Default)]
pub struct StampedeGuard {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl StampedeGuard {
    pub fn new() -> Self {
        Self::default()
    }

    // == Handle ==
    /// Returns the key's mutex, creating it if absent.
    fn handle(&self, key: &str) -> Arc<Mutex<()>> {
        if let Some(existing) = self.locks.get(key) {
            return Arc::clone(existing.value());
        }
        Arc::clone(
            self.locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    // == Acquire ==
    /// Waits for exclusive ownership of `key`'s miss path.
    ///
    /// Dropping the returned permit releases the key and prunes the registry
    /// entry once nobody else holds or awaits it. Dropping the future while it
    /// waits leaves the current holder untouched.
    pub async fn acquire(&self, key: &str) -> KeyPermit<'_> {
        // Created before waiting so an abandoned wait still prunes the handle.
        let mut permit = KeyPermit {
            registry: self,
            key: key.to_string(),
            guard: None,
        };
        permit.guard = Some(self.handle(key).lock_owned().await);
        trace!(key, "stampede guard acquired");

        permit
    }

    /// Number of keys that currently have a live handle.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn release(&self, key: &str) {
        // Only the registry's own reference left: nobody holds or awaits it.
        self.locks
            .remove_if(key, |_, handle| Arc::strong_count(handle) == 1);
    }
}

// == Key Permit ==
/// Exclusive right to resolve a miss for one key.
#[derive(Debug)]
pub struct KeyPermit<'a> {
    registry: &'a StampedeGuard,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyPermit<'_> {
    fn drop(&mut self) {
        // The owned guard holds a strong reference; drop it before pruning.
        self.guard.take();
        self.registry.release(&self.key);
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_handle_removed_after_release() {
        let guard = StampedeGuard::new();

        {
            let _permit = guard.acquire("vehicle:1").await;
            assert_eq!(guard.len(), 1);
        }

        assert!(guard.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let guard = StampedeGuard::new();

        let _a = guard.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), guard.acquire("b")).await;

        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let guard = Arc::new(StampedeGuard::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let guard = Arc::clone(&guard);
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            handles.push(tokio::spawn(async move {
                let _permit = guard.acquire("shared").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(guard.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_keeps_holder() {
        let guard = StampedeGuard::new();
        let holder = guard.acquire("k").await;

        let waited = tokio::time::timeout(Duration::from_millis(20), guard.acquire("k")).await;
        assert!(waited.is_err());

        // Still registered for the holder, then pruned once it releases.
        assert_eq!(guard.len(), 1);
        drop(holder);
        assert!(guard.is_empty());
    }
}
