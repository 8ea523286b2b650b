//! Configuration Module
//!
//! Handles loading cache, resilience and server settings from environment
//! variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::MAX_TTL;
use crate::error::{CacheError, Result};
use crate::resilience::{ResilientExecutor, RetryPolicy};

/// Process-wide configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Soft capacity of the cache store
    pub max_entries: usize,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl_secs: u64,
    /// Expiry sweep interval in seconds
    pub sweep_interval_secs: u64,
    /// HTTP port of the admin surface
    pub server_port: u16,
    /// Attempts per retried operation, including the first
    pub retry_max_attempts: u32,
    /// Delay before the second attempt, in milliseconds
    pub retry_base_delay_ms: u64,
    /// Backoff multiplier between attempts
    pub retry_multiplier: f64,
    /// Batch operations allowed in flight
    pub batch_max_concurrency: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Soft capacity (default: 1000)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `SWEEP_INTERVAL` - Expiry sweep frequency in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `RETRY_MAX_ATTEMPTS` - Attempts per retried operation (default: 3)
    /// - `RETRY_BASE_DELAY_MS` - First backoff delay (default: 100)
    /// - `RETRY_MULTIPLIER` - Backoff multiplier (default: 2.0)
    /// - `BATCH_MAX_CONCURRENCY` - Batch parallelism (default: 4)
    ///
    /// Unset or unparseable variables fall back to their default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            default_ttl_secs: env_or("DEFAULT_TTL", defaults.default_ttl_secs),
            sweep_interval_secs: env_or("SWEEP_INTERVAL", defaults.sweep_interval_secs),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            retry_max_attempts: env_or("RETRY_MAX_ATTEMPTS", defaults.retry_max_attempts),
            retry_base_delay_ms: env_or("RETRY_BASE_DELAY_MS", defaults.retry_base_delay_ms),
            retry_multiplier: env_or("RETRY_MULTIPLIER", defaults.retry_multiplier),
            batch_max_concurrency: env_or("BATCH_MAX_CONCURRENCY", defaults.batch_max_concurrency),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
            self.retry_multiplier,
        )
    }

    /// Builds the executor described by the retry and batch settings.
    pub fn executor(&self) -> Result<ResilientExecutor> {
        ResilientExecutor::new(self.retry_policy(), self.batch_max_concurrency)
    }

    /// Checks every limit before anything is started.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::InvalidArgument(
                "MAX_ENTRIES must be positive".to_string(),
            ));
        }
        if self.default_ttl_secs == 0 || self.default_ttl() > MAX_TTL {
            return Err(CacheError::InvalidArgument(format!(
                "DEFAULT_TTL must be between 1 and {} seconds",
                MAX_TTL.as_secs()
            )));
        }
        if self.sweep_interval_secs == 0 || self.sweep_interval() > MAX_TTL {
            return Err(CacheError::InvalidArgument(format!(
                "SWEEP_INTERVAL must be between 1 and {} seconds",
                MAX_TTL.as_secs()
            )));
        }
        self.executor().map(|_| ())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl_secs: 300,
            sweep_interval_secs: 300,
            server_port: 3000,
            retry_max_attempts: 3,
            retry_base_delay_ms: 100,
            retry_multiplier: 2.0,
            batch_max_concurrency: 4,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
