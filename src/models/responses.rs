//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies. Statistics are
//! served as [`StatsSnapshot`](crate::cache::StatsSnapshot) directly.

use serde::Serialize;

use crate::cache::EntryInfo;

/// Response body for GET /entries/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetEntryResponse {
    pub key: String,
    pub value: serde_json::Value,
    /// Age, remaining TTL, access count and tags of the entry
    pub metadata: EntryInfo,
}

/// Response body for PUT /entries
#[derive(Debug, Clone, Serialize)]
pub struct SetEntryResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetEntryResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for deletions and invalidations
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InvalidationResponse {
    /// Number of entries removed
    pub removed: usize,
}

impl InvalidationResponse {
    pub fn new(removed: usize) -> Self {
        Self { removed }
    }
}

/// Response body for POST /clear
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
    pub removed: usize,
}

impl ClearResponse {
    pub fn new(removed: usize) -> Self {
        Self {
            message: format!("Cleared {} entries", removed),
            removed,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Whether the background expiry sweep is attached
    pub sweeping: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(sweeping: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            sweeping,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
