//! Cached book CRUD and pruning.
//!
//! Provides functions for recording catalog results, reading them back, and
//! removing expired or surplus rows.

use std::collections::HashSet;

use super::connection::CacheDb;
use super::hash::{content_book_key, source_book_key};
use super::queries::{bump_query, load_query};
use super::stats::RecordedSearch;
use super::{from_sql_timestamp, to_sql_timestamp};
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// One catalog search result as returned by a catalog source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResult {
    /// Catalog the result came from, e.g. `openlibrary`.
    pub source: String,
    /// Identifier within that catalog, if it has one.
    pub source_id: Option<String>,
    pub title: String,
    pub author: Option<String>,
    pub first_publish_year: Option<i32>,
    pub isbn: Option<String>,
    pub cover_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,
}

impl BookResult {
    /// Cache key: source identity when available, content hash otherwise.
    pub fn book_key(&self) -> String {
        match self.source_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => source_book_key(&self.source, id),
            _ => content_book_key(&self.title, self.author.as_deref()),
        }
    }
}

/// A stored snapshot of one catalog search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedBook {
    pub book_key: String,
    #[serde(flatten)]
    pub book: BookResult,
    /// Normalized term whose catalog fetch last refreshed this row.
    pub search_query: String,
    pub cached_at: DateTime<Utc>,
}

const BOOK_COLUMNS: &str = "b.book_key, b.source, b.source_id, b.title, b.author, b.first_publish_year, b.isbn,
    b.cover_id, b.subjects_json, b.search_query, b.cached_at";

struct BookRow {
    book_key: String,
    source: String,
    source_id: Option<String>,
    title: String,
    author: Option<String>,
    first_publish_year: Option<i32>,
    isbn: Option<String>,
    cover_id: Option<i64>,
    subjects_json: Option<String>,
    search_query: String,
    cached_at: String,
}

impl BookRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            book_key: row.get(0)?,
            source: row.get(1)?,
            source_id: row.get(2)?,
            title: row.get(3)?,
            author: row.get(4)?,
            first_publish_year: row.get(5)?,
            isbn: row.get(6)?,
            cover_id: row.get(7)?,
            subjects_json: row.get(8)?,
            search_query: row.get(9)?,
            cached_at: row.get(10)?,
        })
    }

    fn into_cached_book(self) -> Result<CachedBook, Error> {
        let subjects = self
            .subjects_json
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();

        Ok(CachedBook {
            book_key: self.book_key,
            book: BookResult {
                source: self.source,
                source_id: self.source_id,
                title: self.title,
                author: self.author,
                first_publish_year: self.first_publish_year,
                isbn: self.isbn,
                cover_id: self.cover_id,
                subjects,
            },
            search_query: self.search_query,
            cached_at: from_sql_timestamp(&self.cached_at)?,
        })
    }
}

/// Insert or refresh one row per distinct result key.
///
/// The first occurrence of a key within `results` wins. Returns the written
/// keys in result order.
fn upsert_books(
    conn: &rusqlite::Connection, query: &str, results: &[BookResult], cached_at: &str,
) -> Result<Vec<String>, Error> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO cached_books (
            book_key, source, source_id, title, author, first_publish_year, isbn, cover_id,
            subjects_json, search_query, cached_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(book_key) DO UPDATE SET
            source = excluded.source,
            source_id = excluded.source_id,
            title = excluded.title,
            author = excluded.author,
            first_publish_year = excluded.first_publish_year,
            isbn = excluded.isbn,
            cover_id = excluded.cover_id,
            subjects_json = excluded.subjects_json,
            search_query = excluded.search_query,
            cached_at = MAX(cached_at, excluded.cached_at)",
    )?;

    let mut seen = HashSet::with_capacity(results.len());
    let mut keys = Vec::with_capacity(results.len());
    for book in results {
        let key = book.book_key();
        if !seen.insert(key.clone()) {
            continue;
        }

        let subjects_json = if book.subjects.is_empty() { None } else { serde_json::to_string(&book.subjects).ok() };

        stmt.execute(params![
            key,
            &book.source,
            &book.source_id,
            &book.title,
            &book.author,
            &book.first_publish_year,
            &book.isbn,
            &book.cover_id,
            subjects_json,
            query,
            cached_at,
        ])?;
        keys.push(key);
    }

    Ok(keys)
}

/// Replace the result list of `query` with `keys`, ranked in order.
fn replace_result_list(conn: &rusqlite::Connection, query: &str, keys: &[String], cached_at: &str) -> Result<(), Error> {
    conn.execute("DELETE FROM search_results WHERE query = ?1", params![query])?;

    let mut stmt = conn
        .prepare_cached("INSERT INTO search_results (query, book_key, rank, cached_at) VALUES (?1, ?2, ?3, ?4)")?;
    for (rank, key) in keys.iter().enumerate() {
        stmt.execute(params![query, key, i64::try_from(rank).unwrap_or(i64::MAX), cached_at])?;
    }
    Ok(())
}

impl CacheDb {
    /// Record one catalog search for an already-normalized term at `now`.
    ///
    /// The ledger bump, the book upserts and the term's new result list
    /// commit together.
    pub async fn store_search_results(
        &self, query: &str, results: &[BookResult], now: DateTime<Utc>,
    ) -> Result<RecordedSearch, Error> {
        let query = query.to_string();
        let results = results.to_vec();

        self.call("store_search_results", move |conn| -> Result<RecordedSearch, Error> {
            let cached_at = to_sql_timestamp(now);
            let tx = conn.transaction()?;
            bump_query(&tx, &query, results.len() as u64, now)?;
            let keys = upsert_books(&tx, &query, &results, &cached_at)?;
            replace_result_list(&tx, &query, &keys, &cached_at)?;
            let entry = load_query(&tx, &query)?
                .ok_or_else(|| Error::NotFound(format!("search query {query:?} vanished during write")))?;
            tx.commit()?;

            Ok(RecordedSearch { query: entry, books_cached: keys.len() })
        })
        .await
    }

    /// Get a cached book by key.
    ///
    /// Returns None if the key doesn't exist in the cache.
    pub async fn get_book(&self, book_key: &str) -> Result<Option<CachedBook>, Error> {
        let book_key = book_key.to_string();
        self.call("get_book", move |conn| -> Result<Option<CachedBook>, Error> {
            let mut stmt = conn.prepare(&format!("SELECT {BOOK_COLUMNS} FROM cached_books b WHERE b.book_key = ?1"))?;
            let result = stmt.query_row(params![book_key], BookRow::from_row);

            match result {
                Ok(row) => row.into_cached_book().map(Some),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// The result list of the latest fetch for `query`, in catalog order.
    ///
    /// Empty when the list was fetched before `fresh_since`, or when cleanup
    /// has removed any of its books: a partial list is never returned.
    pub async fn books_for_query(&self, query: &str, fresh_since: DateTime<Utc>) -> Result<Vec<CachedBook>, Error> {
        let query = query.to_string();
        let fresh_since = to_sql_timestamp(fresh_since);

        self.call("books_for_query", move |conn| -> Result<Vec<CachedBook>, Error> {
            let listed: i64 = conn.query_row(
                "SELECT COUNT(*) FROM search_results WHERE query = ?1 AND cached_at >= ?2",
                params![query, fresh_since],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {BOOK_COLUMNS} FROM search_results r
                JOIN cached_books b ON b.book_key = r.book_key
                WHERE r.query = ?1 AND r.cached_at >= ?2
                ORDER BY r.rank ASC"
            ))?;
            let rows = stmt
                .query_map(params![query, fresh_since], BookRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            if rows.len() as i64 != listed {
                tracing::debug!(%query, listed, present = rows.len(), "cached result list incomplete");
                return Ok(Vec::new());
            }

            rows.into_iter().map(BookRow::into_cached_book).collect()
        })
        .await
    }

    /// Delete books, and result lists, cached strictly before `cutoff`.
    ///
    /// Returns the number of deleted books.
    pub async fn purge_expired_books(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let cutoff = to_sql_timestamp(cutoff);
        self.call("purge_expired_books", move |conn| -> Result<u64, Error> {
            let tx = conn.transaction()?;
            let count = tx.execute("DELETE FROM cached_books WHERE cached_at < ?1", params![cutoff])?;
            tx.execute("DELETE FROM search_results WHERE cached_at < ?1", params![cutoff])?;
            tx.commit()?;
            Ok(count as u64)
        })
        .await
    }

    /// Delete the oldest books until at most `max_entries` of those cached at
    /// or before `snapshot_at` remain.
    ///
    /// Rows written after `snapshot_at` are neither counted nor deleted.
    /// Result lists that named a deleted book are left in place and read as
    /// incomplete. Returns the number of deleted entries.
    pub async fn trim_oldest_books(&self, max_entries: u64, snapshot_at: DateTime<Utc>) -> Result<u64, Error> {
        let max = i64::try_from(max_entries).unwrap_or(i64::MAX);
        let snapshot_at = to_sql_timestamp(snapshot_at);

        self.call("trim_oldest_books", move |conn| -> Result<u64, Error> {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM cached_books WHERE cached_at <= ?1",
                params![snapshot_at],
                |row| row.get(0),
            )?;
            if count <= max {
                return Ok(0);
            }

            let to_delete = count - max;
            let deleted = conn.execute(
                "DELETE FROM cached_books WHERE book_key IN (
                    SELECT book_key FROM cached_books
                    WHERE cached_at <= ?1
                    ORDER BY cached_at ASC, book_key ASC
                    LIMIT ?2
                )",
                params![snapshot_at, to_delete],
            )?;
            Ok(deleted as u64)
        })
        .await
    }
}

/// Distinct sample results for tests.
#[cfg(test)]
pub(crate) fn sample_books(prefix: &str, count: usize) -> Vec<BookResult> {
    (0..count)
        .map(|i| BookResult {
            source: "test".to_string(),
            source_id: Some(format!("{prefix}-{i}")),
            title: format!("{prefix} volume {i}"),
            author: Some("A. Author".to_string()),
            ..Default::default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn book(title: &str, author: Option<&str>, source_id: Option<&str>) -> BookResult {
        BookResult {
            source: "openlibrary".to_string(),
            source_id: source_id.map(str::to_string),
            title: title.to_string(),
            author: author.map(str::to_string),
            first_publish_year: Some(1965),
            isbn: Some("9780441013593".to_string()),
            cover_id: Some(11_481_354),
            subjects: vec!["Science fiction".to_string()],
        }
    }

    fn keys(books: &[CachedBook]) -> Vec<String> {
        books.iter().map(|b| b.book_key.clone()).collect()
    }

    async fn total_books(db: &CacheDb) -> u64 {
        db.cache_stats().await.unwrap().total_books
    }

    #[test]
    fn test_book_key_prefers_source_id() {
        let with_id = book("Dune", Some("Frank Herbert"), Some("/works/OL893415W"));
        assert_eq!(with_id.book_key(), "openlibrary:/works/OL893415W");

        let blank_id = book("Dune", Some("Frank Herbert"), Some("  "));
        assert!(blank_id.book_key().starts_with("hash:"));
        assert_eq!(blank_id.book_key(), book("dune", Some("frank herbert"), None).book_key());
    }

    #[tokio::test]
    async fn test_store_and_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let dune = book("Dune", Some("Frank Herbert"), Some("/works/OL893415W"));

        let recorded = db.store_search_results("dune", &[dune.clone()], Utc::now()).await.unwrap();
        assert_eq!(recorded.books_cached, 1);
        assert_eq!(recorded.query.search_count, 1);
        assert_eq!(recorded.query.result_count, 1);

        let cached = db.get_book(&dune.book_key()).await.unwrap().unwrap();
        assert_eq!(cached.book, dune);
        assert_eq!(cached.search_query, "dune");
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.get_book("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_shared_book_stays_in_both_lists() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = Utc::now();
        let dune = sample_books("dune", 3);
        let earlier = now - Duration::days(3);

        db.store_search_results("dune", &dune, earlier).await.unwrap();
        db.store_search_results("frank herbert", &dune[..1], now).await.unwrap();

        assert_eq!(total_books(&db).await, 3);
        let cached = db.get_book(&dune[0].book_key()).await.unwrap().unwrap();
        assert_eq!(cached.search_query, "frank herbert");
        assert!(cached.cached_at > earlier);

        let fresh_since = now - Duration::days(7);
        assert_eq!(db.books_for_query("dune", fresh_since).await.unwrap().len(), 3);
        assert_eq!(db.books_for_query("frank herbert", fresh_since).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_refetch_replaces_result_list() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = Utc::now();
        let first = sample_books("dune", 3);
        let second = sample_books("arrakis", 2);

        db.store_search_results("dune", &first, now - Duration::hours(1)).await.unwrap();
        db.store_search_results("dune", &second, now).await.unwrap();

        let listed = db.books_for_query("dune", now - Duration::days(1)).await.unwrap();
        assert_eq!(keys(&listed), second.iter().map(BookResult::book_key).collect::<Vec<_>>());
        // books from the earlier fetch stay cached until cleanup
        assert_eq!(total_books(&db).await, 5);
    }

    #[tokio::test]
    async fn test_cached_at_never_moves_back() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = Utc::now();
        let dune = sample_books("dune", 1);

        db.store_search_results("dune", &dune, now).await.unwrap();
        db.store_search_results("spice", &dune, now - Duration::days(2)).await.unwrap();

        let cached = db.get_book(&dune[0].book_key()).await.unwrap().unwrap();
        assert_eq!(to_sql_timestamp(cached.cached_at), to_sql_timestamp(now));
    }

    #[tokio::test]
    async fn test_duplicate_keys_in_one_batch() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let first = book("Dune", None, Some("/works/OL1W"));
        let dup = BookResult { title: "Dune (reissue)".to_string(), ..first.clone() };

        let recorded = db.store_search_results("dune", &[first.clone(), dup], Utc::now()).await.unwrap();
        assert_eq!(recorded.books_cached, 1);
        assert_eq!(recorded.query.result_count, 2);

        let cached = db.get_book(&first.book_key()).await.unwrap().unwrap();
        assert_eq!(cached.book.title, "Dune");
        assert_eq!(db.books_for_query("dune", Utc::now() - Duration::days(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_books_for_query_freshness_and_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = Utc::now();
        let new_books = sample_books("new", 3);

        db.store_search_results("old", &sample_books("old", 2), now - Duration::days(10))
            .await
            .unwrap();
        db.store_search_results("new", &new_books, now).await.unwrap();

        let fresh = db.books_for_query("new", now - Duration::days(7)).await.unwrap();
        assert_eq!(keys(&fresh), new_books.iter().map(BookResult::book_key).collect::<Vec<_>>());

        let stale = db.books_for_query("old", now - Duration::days(7)).await.unwrap();
        assert!(stale.is_empty());
    }

    #[tokio::test]
    async fn test_purge_expired_books() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = Utc::now();
        db.store_search_results("old", &sample_books("old", 4), now - Duration::days(8))
            .await
            .unwrap();
        db.store_search_results("new", &sample_books("new", 2), now).await.unwrap();

        let deleted = db.purge_expired_books(now - Duration::days(7)).await.unwrap();
        assert_eq!(deleted, 4);
        assert_eq!(total_books(&db).await, 2);
        assert!(db.books_for_query("old", now - Duration::days(30)).await.unwrap().is_empty());

        // the ledger is never pruned
        assert!(db.get_search_query("old").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_trim_oldest_books() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = Utc::now();
        db.store_search_results("a", &sample_books("a", 3), now - Duration::hours(3))
            .await
            .unwrap();
        db.store_search_results("b", &sample_books("b", 3), now - Duration::hours(2))
            .await
            .unwrap();

        let deleted = db.trim_oldest_books(4, now).await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(total_books(&db).await, 4);
        // "a" lost two of its three books, so its list no longer answers
        assert!(db.books_for_query("a", now - Duration::days(1)).await.unwrap().is_empty());
        assert_eq!(db.books_for_query("b", now - Duration::days(1)).await.unwrap().len(), 3);

        assert_eq!(db.trim_oldest_books(4, now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_trim_ignores_rows_after_snapshot() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let snapshot = Utc::now() - Duration::minutes(5);
        db.store_search_results("before", &sample_books("before", 2), snapshot - Duration::minutes(1))
            .await
            .unwrap();
        db.store_search_results("after", &sample_books("after", 5), Utc::now())
            .await
            .unwrap();

        let deleted = db.trim_oldest_books(2, snapshot).await.unwrap();
        assert_eq!(deleted, 0);
        assert_eq!(total_books(&db).await, 7);
    }
}
