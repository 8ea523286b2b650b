//! Resilient execution
//!
//! Retry with exponential backoff and bounded-concurrency batches, plus
//! [`ResilientExecutor`] which bundles both policies and composes them with
//! a cache store's single-flight lookup.

mod batch;
mod retry;

pub use batch::{parallel_map, run_batch};
pub use retry::{retry_async, RetryPolicy};

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::cache::{CacheStore, EntryOptions};
use crate::error::{BoxError, CacheError, Result};

// == Public Constants ==
/// Default number of batch operations allowed in flight
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

// == Resilient Executor ==
/// Retry and batch policies shared by the services of one process.
#[derive(Clone, Debug, PartialEq)]
pub struct ResilientExecutor {
    retry_policy: RetryPolicy,
    max_concurrency: usize,
}

impl Default for ResilientExecutor {
    fn default() -> Self {
        Self {
            retry_policy: RetryPolicy::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl ResilientExecutor {
    pub fn new(retry_policy: RetryPolicy, max_concurrency: usize) -> Result<Self> {
        retry_policy.validate()?;
        if max_concurrency == 0 {
            return Err(CacheError::InvalidArgument(
                "max_concurrency must be positive".to_string(),
            ));
        }

        Ok(Self {
            retry_policy,
            max_concurrency,
        })
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Runs `operation` under this executor's retry policy.
    pub async fn retry<T, E, F, Fut>(&self, cancel: &CancellationToken, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<BoxError>,
    {
        retry_async(&self.retry_policy, cancel, operation).await
    }

    /// Runs a batch with this executor's concurrency bound.
    pub async fn run_batch<T, E, Fut>(
        &self,
        operations: Vec<Fut>,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>>
    where
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        run_batch(operations, self.max_concurrency, cancel).await
    }

    pub async fn parallel_map<I, T, R, E, F, Fut>(
        &self,
        items: I,
        cancel: &CancellationToken,
        f: F,
    ) -> Result<Vec<R>>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        parallel_map(items, self.max_concurrency, cancel, f).await
    }

    /// Cache-aside lookup whose miss path is retried.
    ///
    /// Only the caller that wins the key runs `operation`, retrying it under
    /// this executor's policy; concurrent callers wait for its result. A
    /// retry that runs out of attempts caches nothing and surfaces as
    /// [`CacheError::RetryExhausted`].
    pub async fn cached<V, E, F, Fut>(
        &self,
        store: &CacheStore<V>,
        key: &str,
        options: EntryOptions,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<V>
    where
        V: Clone,
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        E: Into<BoxError>,
    {
        let policy = &self.retry_policy;
        store
            .get_or_compute_cancellable(key, options, cancel, || {
                retry_async(policy, cancel, operation)
            })
            .await
    }
}
