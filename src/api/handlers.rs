//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::cache::{CacheStore, StatsSnapshot};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, GetEntryResponse, HealthResponse, InvalidationResponse, PatternRequest,
    SetEntryRequest, SetEntryResponse, TagsRequest,
};

/// Application state shared across all handlers.
///
/// The store synchronizes internally, so handlers share it through a plain `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheStore<serde_json::Value>>,
}

impl AppState {
    pub fn new(cache: Arc<CacheStore<serde_json::Value>>) -> Self {
        Self { cache }
    }

    /// Starts a store with its expiry sweep from configuration.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = CacheStore::start(
            config.max_entries,
            config.default_ttl(),
            config.sweep_interval(),
        )?;
        Ok(Self::new(cache))
    }
}

/// Handler for PUT /entries
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetEntryRequest>,
) -> Result<Json<SetEntryResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidArgument(error_msg));
    }

    let (key, value, options) = req.into_parts();
    state.cache.set(key.clone(), value, options)?;

    Ok(Json(SetEntryResponse::new(key)))
}

/// Handler for GET /entries/:key
///
/// Counts as a regular cache read for the statistics.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetEntryResponse>> {
    let (value, metadata) = state
        .cache
        .get_with_info(&key)?
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(GetEntryResponse {
        key,
        value,
        metadata,
    }))
}

/// Handler for DELETE /entries/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<InvalidationResponse>> {
    let removed = state.cache.remove_by_key(&key)?;
    Ok(Json(InvalidationResponse::new(removed)))
}

/// Handler for POST /invalidate/pattern
pub async fn invalidate_pattern_handler(
    State(state): State<AppState>,
    Json(req): Json<PatternRequest>,
) -> Result<Json<InvalidationResponse>> {
    let removed = state.cache.remove_by_pattern(&req.pattern)?;
    info!(pattern = %req.pattern, removed, "pattern invalidation via admin API");
    Ok(Json(InvalidationResponse::new(removed)))
}

/// Handler for POST /invalidate/tags
pub async fn invalidate_tags_handler(
    State(state): State<AppState>,
    Json(req): Json<TagsRequest>,
) -> Result<Json<InvalidationResponse>> {
    let removed = state.cache.remove_by_tags(req.tags)?;
    Ok(Json(InvalidationResponse::new(removed)))
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    Json(ClearResponse::new(state.cache.clear()))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.cache.statistics())
}

/// Handler for POST /stats/reset
pub async fn reset_stats_handler(State(state): State<AppState>) -> Json<StatsSnapshot> {
    state.cache.reset_statistics();
    Json(state.cache.statistics())
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.is_sweeping()))
}
