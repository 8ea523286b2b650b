//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::time::Duration;

use serde::Deserialize;

use crate::cache::{EntryOptions, MAX_TTL};

/// Request body for storing an entry (PUT /entries)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON value
/// - `ttl`: Optional TTL in seconds (uses default if not specified)
/// - `tags`: Optional invalidation tags
#[derive(Debug, Clone, Deserialize)]
pub struct SetEntryRequest {
    pub key: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SetEntryRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.trim().is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        match self.ttl {
            Some(0) => return Some("TTL must be positive".to_string()),
            Some(secs) if secs > MAX_TTL.as_secs() => {
                return Some(format!("TTL must not exceed {} seconds", MAX_TTL.as_secs()));
            }
            _ => {}
        }
        None
    }

    /// Splits the request into its entry options.
    pub fn into_parts(self) -> (String, serde_json::Value, EntryOptions) {
        let mut options = EntryOptions::new().tags(self.tags);
        if let Some(secs) = self.ttl {
            options = options.ttl(Duration::from_secs(secs));
        }
        (self.key, self.value, options)
    }
}

/// Request body for POST /invalidate/pattern
#[derive(Debug, Clone, Deserialize)]
pub struct PatternRequest {
    pub pattern: String,
}

/// Request body for POST /invalidate/tags
#[derive(Debug, Clone, Deserialize)]
pub struct TagsRequest {
    pub tags: Vec<String>,
}
