//! Book search and lookup routes.
//!
//! A search is served from the term's complete, fresh result list when there
//! is one, otherwise from the catalog. A cache hit only counts the search in
//! the ledger; a catalog answer is also cached. Failing to read or record the
//! cache is logged and does not fail a search the catalog could answer.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use bibliocache_client::CatalogQuery;
use bibliocache_core::{BookResult, CachedBook, cache::normalize_term};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::cache::stats::is_truthy;
use crate::state::AppState;

/// Query parameters for `GET /books/search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    /// Skip the cache and ask the catalog.
    pub refresh: Option<String>,
}

/// One search result with its cache key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub book_key: String,
    #[serde(flatten)]
    pub book: BookResult,
}

impl From<BookResult> for SearchHit {
    fn from(book: BookResult) -> Self {
        Self { book_key: book.book_key(), book }
    }
}

impl From<CachedBook> for SearchHit {
    fn from(cached: CachedBook) -> Self {
        Self { book_key: cached.book_key, book: cached.book }
    }
}

/// Body of `GET /books/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Normalized search term.
    pub query: String,
    pub cache_hit: bool,
    pub results: Vec<SearchHit>,
    /// Catalog-reported total matches; absent on cache hits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_found: Option<u64>,
}

pub async fn search_handler(
    State(state): State<AppState>, Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = normalize_term(params.q.as_deref().unwrap_or_default())?;

    if !is_truthy(params.refresh.as_deref()) {
        match state.manager.cached_results(&query).await {
            Ok(cached) if !cached.is_empty() => {
                if let Err(e) = state.manager.record_cache_hit(&query, cached.len()).await {
                    tracing::warn!(%query, error = %e, "failed to record cache hit");
                }
                tracing::debug!(%query, results = cached.len(), "served search from cache");

                return Ok(Json(SearchResponse {
                    query,
                    cache_hit: true,
                    results: cached.into_iter().map(SearchHit::from).collect(),
                    total_found: None,
                }));
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(%query, error = %e, "cache lookup failed; falling back to catalog"),
        }
    }

    let response = state
        .catalog
        .search(&CatalogQuery::new(query.clone(), state.search_limit))
        .await?;
    if let Err(e) = state.manager.record_search(&query, &response.results).await {
        tracing::warn!(%query, error = %e, "failed to record search");
    }

    Ok(Json(SearchResponse {
        query,
        cache_hit: false,
        total_found: Some(response.total_found),
        results: response.results.into_iter().map(SearchHit::from).collect(),
    }))
}

pub async fn get_book_handler(
    State(state): State<AppState>, Path(key): Path<String>,
) -> Result<Json<CachedBook>, ApiError> {
    Ok(Json(state.manager.get_book(&key).await?))
}
