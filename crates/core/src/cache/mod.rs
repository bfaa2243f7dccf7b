//! SQLite-backed book cache and search-query ledger.
//!
//! This module provides the persistent half of the book cache using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Cached catalog results keyed by source identity or content hash
//! - A popularity ledger of normalized search terms
//! - Automatic schema migrations
//! - Age-based expiry and oldest-first trimming against a hard ceiling

pub mod books;
pub mod connection;
pub mod hash;
pub mod manager;
pub mod migrations;
pub mod policy;
pub mod queries;
pub mod stats;

pub use crate::Error;

pub use books::{BookResult, CachedBook};
pub use connection::CacheDb;
pub use manager::BookCacheManager;
pub use policy::CachePolicy;
pub use queries::{SearchAnalytics, SearchQuery, normalize_term};
pub use stats::{CacheHealth, CacheStats, CleanupReport, RecordedSearch};

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp for storage.
///
/// Fixed precision and a `Z` suffix keep stored values lexicographically
/// ordered, so SQL comparisons on the text column match time order.
pub(crate) fn to_sql_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
pub(crate) fn from_sql_timestamp(raw: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::InvalidTimestamp(raw.to_string()))
}
