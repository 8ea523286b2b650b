//! Bounded-concurrency batch execution
//!
//! Runs independent operations on the Tokio runtime with at most
//! `max_concurrency` in flight. Batches are all-or-nothing: the first failure
//! aborts whatever is still running and becomes the batch's error.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{BoxError, CacheError, Result};

// == Run Batch ==
/// Runs `operations` with bounded concurrency and returns their results in
/// input order.
///
/// Cancellation is checked before each operation starts; operations already
/// running are left to finish or be aborted by a failure elsewhere.
pub async fn run_batch<T, E, Fut>(
    operations: Vec<Fut>,
    max_concurrency: usize,
    cancel: &CancellationToken,
) -> Result<Vec<T>>
where
    Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    if max_concurrency == 0 {
        return Err(CacheError::InvalidArgument(
            "max_concurrency must be positive".to_string(),
        ));
    }
    if cancel.is_cancelled() {
        return Err(CacheError::Cancelled);
    }

    let total = operations.len();
    debug!(total, max_concurrency, "Starting batch");

    let mut join_set = JoinSet::new();
    let semaphore = Arc::new(Semaphore::new(max_concurrency));

    for (index, operation) in operations.into_iter().enumerate() {
        let slots = Arc::clone(&semaphore);
        let cancel = cancel.clone();

        join_set.spawn(async move {
            // Acquire semaphore permit to limit concurrency
            let _permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => return (index, Err(CacheError::Cancelled)),
                permit = slots.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return (index, Err(CacheError::Cancelled)),
                },
            };
            if cancel.is_cancelled() {
                return (index, Err(CacheError::Cancelled));
            }

            (index, operation.await.map_err(CacheError::computation))
        });
    }

    let mut results: Vec<Option<T>> = std::iter::repeat_with(|| None).take(total).collect();

    while let Some(joined) = join_set.join_next().await {
        let err = match joined {
            Ok((index, Ok(value))) => {
                results[index] = Some(value);
                continue;
            }
            Ok((index, Err(err))) => {
                warn!(index, error = %err, "Batch operation failed, aborting batch");
                err
            }
            Err(join_err) => {
                warn!(error = %join_err, "Batch task panicked, aborting batch");
                CacheError::computation(join_err.to_string())
            }
        };

        join_set.abort_all();
        return Err(err);
    }

    results
        .into_iter()
        .collect::<Option<Vec<T>>>()
        .ok_or_else(|| CacheError::computation("batch operation produced no result"))
}

// == Parallel Map ==
/// Applies `f` to every item with bounded concurrency, all-or-nothing.
pub async fn parallel_map<I, T, R, E, F, Fut>(
    items: I,
    max_concurrency: usize,
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
    let operations: Vec<Fut> = items.into_iter().map(f).collect();
    run_batch(operations, max_concurrency, cancel).await
}
