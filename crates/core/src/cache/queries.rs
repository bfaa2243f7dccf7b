//! Search-query ledger operations.
//!
//! The ledger keeps one row per normalized search term and is never pruned,
//! so it doubles as the popularity record for the catalog.

use super::connection::CacheDb;
use super::{from_sql_timestamp, to_sql_timestamp};
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// Longest accepted normalized search term, in characters.
pub const MAX_TERM_CHARS: usize = 200;

/// One ledger entry for a normalized search term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub query: String,
    pub search_count: u64,
    pub last_searched: DateTime<Utc>,
    pub result_count: u64,
    pub first_searched: DateTime<Utc>,
}

/// Aggregates over the whole ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnalytics {
    pub unique_terms: u64,
    pub total_searches: u64,
    pub total_results_returned: u64,
    pub average_results_per_search: f64,
    pub average_searches_per_term: f64,
}

impl SearchAnalytics {
    /// Derive averages from raw totals. Empty ledgers average to zero.
    pub fn from_totals(unique_terms: u64, total_searches: u64, total_results_returned: u64) -> Self {
        let ratio = |num: u64, den: u64| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        Self {
            unique_terms,
            total_searches,
            total_results_returned,
            average_results_per_search: ratio(total_results_returned, total_searches),
            average_searches_per_term: ratio(total_searches, unique_terms),
        }
    }
}

/// Normalize a raw search term into its ledger key.
///
/// Trims, lowercases and collapses internal whitespace.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the term is empty after normalization or
/// longer than [`MAX_TERM_CHARS`].
pub fn normalize_term(term: &str) -> Result<String, Error> {
    let normalized = term
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");

    if normalized.is_empty() {
        return Err(Error::InvalidInput("search term cannot be empty".to_string()));
    }

    let chars = normalized.chars().count();
    if chars > MAX_TERM_CHARS {
        return Err(Error::InvalidInput(format!(
            "search term too long: {chars} chars (max {MAX_TERM_CHARS})"
        )));
    }

    Ok(normalized)
}

const QUERY_COLUMNS: &str = "query, search_count, result_count, first_searched, last_searched";

struct QueryRow {
    query: String,
    search_count: i64,
    result_count: i64,
    first_searched: String,
    last_searched: String,
}

impl QueryRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            query: row.get(0)?,
            search_count: row.get(1)?,
            result_count: row.get(2)?,
            first_searched: row.get(3)?,
            last_searched: row.get(4)?,
        })
    }

    fn into_search_query(self) -> Result<SearchQuery, Error> {
        Ok(SearchQuery {
            query: self.query,
            search_count: self.search_count.max(0) as u64,
            last_searched: from_sql_timestamp(&self.last_searched)?,
            result_count: self.result_count.max(0) as u64,
            first_searched: from_sql_timestamp(&self.first_searched)?,
        })
    }
}

/// Count one more search for `query` inside an open transaction.
///
/// Creates the row on first use. `last_searched` never moves backwards.
pub(crate) fn bump_query(
    conn: &rusqlite::Connection, query: &str, result_count: u64, now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    let now = to_sql_timestamp(now);
    conn.execute(
        "INSERT INTO search_queries (query, search_count, result_count, first_searched, last_searched)
        VALUES (?1, 1, ?2, ?3, ?3)
        ON CONFLICT(query) DO UPDATE SET
            search_count = search_count + 1,
            result_count = result_count + excluded.result_count,
            last_searched = MAX(last_searched, excluded.last_searched)",
        params![query, i64::try_from(result_count).unwrap_or(i64::MAX), now],
    )?;
    Ok(())
}

pub(crate) fn load_query(conn: &rusqlite::Connection, query: &str) -> Result<Option<SearchQuery>, Error> {
    let mut stmt = conn.prepare_cached(&format!("SELECT {QUERY_COLUMNS} FROM search_queries WHERE query = ?1"))?;
    let result = stmt.query_row(params![query], QueryRow::from_row);

    match result {
        Ok(row) => row.into_search_query().map(Some),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl CacheDb {
    /// Get the ledger entry for an already-normalized term.
    pub async fn get_search_query(&self, query: &str) -> Result<Option<SearchQuery>, Error> {
        let query = query.to_string();
        self.call("get_search_query", move |conn| load_query(conn, &query))
            .await
    }

    /// Count one search for an already-normalized term without touching any
    /// cached book or result list.
    ///
    /// Used when a search is answered from the cache, so serving rows never
    /// extends their lifetime.
    pub async fn bump_search_query(
        &self, query: &str, result_count: u64, now: DateTime<Utc>,
    ) -> Result<SearchQuery, Error> {
        let query = query.to_string();
        self.call("bump_search_query", move |conn| -> Result<SearchQuery, Error> {
            let tx = conn.transaction()?;
            bump_query(&tx, &query, result_count, now)?;
            let entry = load_query(&tx, &query)?
                .ok_or_else(|| Error::NotFound(format!("search query {query:?} vanished during write")))?;
            tx.commit()?;
            Ok(entry)
        })
        .await
    }

    /// Most-used terms, by descending count, then most recent use, then term.
    pub async fn popular_searches(&self, limit: u32) -> Result<Vec<SearchQuery>, Error> {
        self.call("popular_searches", move |conn| -> Result<Vec<SearchQuery>, Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {QUERY_COLUMNS} FROM search_queries
                ORDER BY search_count DESC, last_searched DESC, query ASC
                LIMIT ?1"
            ))?;

            let rows = stmt
                .query_map(params![i64::from(limit)], QueryRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter().map(QueryRow::into_search_query).collect()
        })
        .await
    }

    /// Aggregate usage across the whole ledger.
    pub async fn search_analytics(&self) -> Result<SearchAnalytics, Error> {
        self.call("search_analytics", |conn| -> Result<SearchAnalytics, Error> {
            let (terms, searches, results): (i64, i64, i64) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(search_count), 0), COALESCE(SUM(result_count), 0)
                FROM search_queries",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

            Ok(SearchAnalytics::from_totals(terms.max(0) as u64, searches.max(0) as u64, results.max(0) as u64))
        })
        .await
    }
}
