//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache entries. Lookups
//! already expire entries lazily, so the sweep only reclaims memory held by
//! keys nobody reads any more.

use std::panic::AssertUnwindSafe;
use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;

// == Sweep Handle ==
/// Owner of a running sweep task. Stopping or dropping the handle ends it.
#[derive(Debug)]
pub struct SweepHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Signals the task to stop after its current pass.
    pub fn stop(self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// == Spawn Sweep Task ==
/// Spawns a background task that periodically sweeps expired entries.
///
/// The task holds only a weak reference, so it never keeps its store alive:
/// once the last `Arc` is dropped the next tick ends the task.
///
/// # Arguments
/// * `store` - Weak reference to the store to sweep
/// * `interval` - Time between sweep passes
///
/// # Example
/// ```ignore
/// let store = Arc::new(CacheStore::<String>::new(1000, Duration::from_secs(300))?);
/// let sweeper = spawn_sweep_task(Arc::downgrade(&store), Duration::from_secs(300));
/// // Later, during shutdown:
/// sweeper.stop();
/// ```
pub fn spawn_sweep_task<V>(store: Weak<CacheStore<V>>, interval: Duration) -> SweepHandle
where
    V: Send + Sync + 'static,
{
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        info!(
            interval_ms = interval.as_millis() as u64,
            "Starting expiry sweep task"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the first sweep waits a full period.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Expiry sweep task stopped");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let Some(store) = store.upgrade() else {
                debug!("Cache store dropped, ending expiry sweep task");
                break;
            };

            match std::panic::catch_unwind(AssertUnwindSafe(|| store.sweep_expired())) {
                Ok(0) => debug!("Expiry sweep: no expired entries found"),
                Ok(removed) => info!(removed, "Expiry sweep: removed expired entries"),
                Err(_) => warn!("Expiry sweep pass aborted; retrying on next tick"),
            }
        }
    });

    SweepHandle { cancel, task }
}
