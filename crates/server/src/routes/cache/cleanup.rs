//! `GET` and `POST /cache/cleanup`.

use axum::{Json, extract::State};
use bibliocache_core::{CacheHealth, CacheStats, CleanupReport};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// Body of `POST /cache/cleanup`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub before: CacheStats,
    pub after: CacheStats,
    #[serde(flatten)]
    pub report: CleanupReport,
}

/// Body of `GET /cache/cleanup`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupStatusResponse {
    #[serde(flatten)]
    pub health: CacheHealth,
    pub soft_ceiling: u64,
    pub hard_ceiling: u64,
    pub staleness_days: u32,
}

/// Run cleanup and report the stats on either side of it.
///
/// `before` and `after` are separate reads, so concurrent searches can make
/// `before - after` differ from the reported removal counts.
pub async fn cleanup_handler(State(state): State<AppState>) -> Result<Json<CleanupResponse>, ApiError> {
    let before = state.manager.get_cache_stats().await?;
    let report = state.manager.cleanup_cache().await?;
    let after = state.manager.get_cache_stats().await?;

    Ok(Json(CleanupResponse { before, after, report }))
}

pub async fn cleanup_status_handler(State(state): State<AppState>) -> Result<Json<CleanupStatusResponse>, ApiError> {
    let health = state.manager.cache_health().await?;
    let policy = state.manager.policy();

    Ok(Json(CleanupStatusResponse {
        health,
        soft_ceiling: policy.soft_ceiling,
        hard_ceiling: policy.hard_ceiling,
        staleness_days: policy.staleness_days,
    }))
}
