//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Boxed error produced by a caller-supplied factory or operation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// == Cache Error Enum ==
/// Unified error type for the cache and resilience layers.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Blank key/pattern or a non-positive limit
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller's cancellation token fired before completion
    #[error("Operation cancelled")]
    Cancelled,

    /// The supplied factory or operation returned an error
    #[error("Computation failed: {0}")]
    ComputationFailed(#[source] BoxError),

    /// Every attempt of a retried operation failed
    #[error("All {attempts} attempts failed: {last}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        last: Box<CacheError>,
    },

    /// Key not found (admin surface only)
    #[error("Key not found: {0}")]
    NotFound(String),
}

impl CacheError {
    /// Wraps a caller error, keeping `CacheError`s produced by nested cache
    /// calls intact instead of double-wrapping them.
    pub fn computation<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        match err.into().downcast::<CacheError>() {
            Ok(inner) => *inner,
            Err(other) => CacheError::ComputationFailed(other),
        }
    }

    /// Returns true for the cancellation outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CacheError::Cancelled)
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::ComputationFailed(_) | CacheError::RetryExhausted { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_computation_wraps_foreign_error() {
        let err = CacheError::computation(anyhow::anyhow!("backend down"));
        assert!(matches!(err, CacheError::ComputationFailed(_)));
        assert!(err.to_string().contains("backend down"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_computation_keeps_cache_error() {
        let err = CacheError::computation(CacheError::Cancelled);
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_retry_exhausted_carries_last_error() {
        let err = CacheError::RetryExhausted {
            attempts: 3,
            last: Box::new(CacheError::computation("timeout")),
        };
        assert!(err.to_string().contains("3 attempts"));
        assert!(err.to_string().contains("timeout"));
    }
}
