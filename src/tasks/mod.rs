//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside a cache store.
//!
//! # Tasks
//! - Expiry sweep: removes expired cache entries at a fixed interval

mod sweep;

pub use sweep::{spawn_sweep_task, SweepHandle};
