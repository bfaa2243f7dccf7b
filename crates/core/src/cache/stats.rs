//! Result types for cache statistics and maintenance.

use super::connection::CacheDb;
use super::from_sql_timestamp;
use super::queries::SearchQuery;
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time cache totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_books: u64,
    pub unique_search_terms: u64,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

/// Stats plus the health flags derived from the configured ceilings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheHealth {
    #[serde(flatten)]
    pub stats: CacheStats,
    pub cache_healthy: bool,
    pub needs_cleanup: bool,
}

/// Outcome of one cleanup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    /// Rows removed for being older than the staleness window.
    pub removed: u64,
    /// Rows removed to bring the snapshot population down to the hard ceiling.
    pub old_removed: u64,
}

impl CleanupReport {
    pub fn total(&self) -> u64 {
        self.removed + self.old_removed
    }
}

/// Outcome of recording one search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedSearch {
    /// Ledger entry after the update.
    pub query: SearchQuery,
    /// Distinct book rows written or refreshed.
    pub books_cached: usize,
}

impl CacheDb {
    /// Read book and ledger totals in a single store call.
    pub async fn cache_stats(&self) -> Result<CacheStats, Error> {
        self.call("cache_stats", |conn| -> Result<CacheStats, Error> {
            let (total, oldest, newest): (i64, Option<String>, Option<String>) = conn.query_row(
                "SELECT COUNT(*), MIN(cached_at), MAX(cached_at) FROM cached_books",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;
            let terms: i64 = conn.query_row("SELECT COUNT(*) FROM search_queries", [], |row| row.get(0))?;

            Ok(CacheStats {
                total_books: total.max(0) as u64,
                unique_search_terms: terms.max(0) as u64,
                oldest_entry: oldest.as_deref().map(from_sql_timestamp).transpose()?,
                newest_entry: newest.as_deref().map(from_sql_timestamp).transpose()?,
            })
        })
        .await
    }
}
