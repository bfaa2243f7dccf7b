//! `GET /cache/stats`.

use axum::{
    Json,
    extract::{Query, State},
};
use bibliocache_core::{CacheStats, SearchAnalytics, SearchQuery};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for the stats route.
///
/// Kept as raw strings so a malformed `popularLimit` falls back to the
/// default instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsParams {
    pub include_popular: Option<String>,
    pub popular_limit: Option<String>,
}

impl StatsParams {
    pub fn wants_popular(&self) -> bool {
        is_truthy(self.include_popular.as_deref())
    }
}

/// `true`, `1` and `yes` (any case) enable a flag.
pub(crate) fn is_truthy(raw: Option<&str>) -> bool {
    raw.map(str::trim)
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
}

/// Body of the stats route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popular_searches: Option<Vec<SearchQuery>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics: Option<SearchAnalytics>,
}

pub async fn stats_handler(
    State(state): State<AppState>, Query(params): Query<StatsParams>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.manager.get_cache_stats().await?;

    let (popular_searches, analytics) = if params.wants_popular() {
        let limit = state
            .manager
            .policy()
            .parse_popular_limit(params.popular_limit.as_deref());
        let popular = state.manager.get_popular_searches(Some(i64::from(limit))).await?;
        let analytics = state.manager.search_analytics().await?;
        (Some(popular), Some(analytics))
    } else {
        (None, None)
    };

    Ok(Json(StatsResponse { stats, popular_searches, analytics }))
}
