//! Book cache manager.
//!
//! Mediates between search requests and the persistent cache, and provides
//! the statistics and maintenance operations. The manager holds no mutable
//! state of its own; every call goes straight to the injected [`CacheDb`].
//!
//! ### Cleanup
//!
//! Cleanup takes a snapshot instant `t` and then:
//!
//! 1. deletes rows cached before `t - staleness` (`removed`);
//! 2. if more than `hard_ceiling` rows cached at or before `t` remain,
//!    deletes the oldest of them down to the ceiling (`old_removed`).
//!
//! The two steps are separate store calls and searches keep writing in
//! between. Rows written after `t` are never touched. Two cleanups running at
//! once may both see the same surplus in step 2; the second then deletes
//! nothing or slightly undershoots the ceiling, and the counts each run
//! reports describe only its own deletes.

use super::books::{BookResult, CachedBook};
use super::connection::CacheDb;
use super::policy::CachePolicy;
use super::queries::{SearchAnalytics, SearchQuery, normalize_term};
use super::stats::{CacheHealth, CacheStats, CleanupReport, RecordedSearch};
use crate::Error;
use chrono::{DateTime, Utc};

/// Book cache manager over an injected store.
#[derive(Debug, Clone)]
pub struct BookCacheManager {
    db: CacheDb,
    policy: CachePolicy,
}

impl BookCacheManager {
    pub fn new(db: CacheDb, policy: CachePolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Release the store. Other clones of the manager stop working.
    pub async fn close(self) -> Result<(), Error> {
        self.db.close().await
    }

    /// Totals and entry-age bounds. Read-only.
    pub async fn get_cache_stats(&self) -> Result<CacheStats, Error> {
        self.db.cache_stats().await
    }

    /// Stats with health flags from the configured ceilings.
    pub async fn cache_health(&self) -> Result<CacheHealth, Error> {
        let stats = self.get_cache_stats().await?;
        Ok(CacheHealth {
            cache_healthy: self.policy.is_healthy(stats.total_books),
            needs_cleanup: self.policy.needs_cleanup(stats.total_books),
            stats,
        })
    }

    /// Most-used search terms, at most `limit` of them.
    ///
    /// A missing or non-positive `limit` uses the configured default.
    pub async fn get_popular_searches(&self, limit: Option<i64>) -> Result<Vec<SearchQuery>, Error> {
        let limit = self.policy.popular_limit(limit);
        self.db.popular_searches(limit).await
    }

    /// Ledger-wide usage aggregates.
    pub async fn search_analytics(&self) -> Result<SearchAnalytics, Error> {
        self.db.search_analytics().await
    }

    /// Remove expired rows, then trim to the hard ceiling.
    pub async fn cleanup_cache(&self) -> Result<CleanupReport, Error> {
        self.cleanup_cache_at(Utc::now()).await
    }

    /// [`cleanup_cache`](Self::cleanup_cache) with an explicit snapshot instant.
    pub async fn cleanup_cache_at(&self, snapshot_at: DateTime<Utc>) -> Result<CleanupReport, Error> {
        let cutoff = self.policy.expiry_cutoff(snapshot_at);
        let removed = self.db.purge_expired_books(cutoff).await?;
        let old_removed = self
            .db
            .trim_oldest_books(self.policy.hard_ceiling, snapshot_at)
            .await?;

        let report = CleanupReport { removed, old_removed };
        tracing::info!(
            removed = report.removed,
            old_removed = report.old_removed,
            cutoff = %cutoff,
            "book cache cleanup finished"
        );
        Ok(report)
    }

    /// Count a search for `term` and cache its results.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `term` normalizes to nothing, or a
    /// store error.
    pub async fn record_search(&self, term: &str, results: &[BookResult]) -> Result<RecordedSearch, Error> {
        self.record_search_at(term, results, Utc::now()).await
    }

    /// [`record_search`](Self::record_search) with an explicit timestamp.
    pub async fn record_search_at(
        &self, term: &str, results: &[BookResult], now: DateTime<Utc>,
    ) -> Result<RecordedSearch, Error> {
        let query = normalize_term(term)?;
        let recorded = self.db.store_search_results(&query, results, now).await?;
        tracing::debug!(
            query = %recorded.query.query,
            search_count = recorded.query.search_count,
            books_cached = recorded.books_cached,
            "recorded search"
        );
        Ok(recorded)
    }

    /// Count a search for `term` that was answered from the cache.
    ///
    /// Only the ledger changes; the served rows keep their `cached_at`, so a
    /// popular term still expires and is fetched again.
    pub async fn record_cache_hit(&self, term: &str, served: usize) -> Result<SearchQuery, Error> {
        self.record_cache_hit_at(term, served, Utc::now()).await
    }

    /// [`record_cache_hit`](Self::record_cache_hit) with an explicit timestamp.
    pub async fn record_cache_hit_at(&self, term: &str, served: usize, now: DateTime<Utc>) -> Result<SearchQuery, Error> {
        let query = normalize_term(term)?;
        let entry = self.db.bump_search_query(&query, served as u64, now).await?;
        tracing::debug!(query = %entry.query, search_count = entry.search_count, served, "recorded cache hit");
        Ok(entry)
    }

    /// The complete, fresh result list for `term`, in result order.
    ///
    /// Empty when the term was never fetched, its list is stale, or cleanup
    /// removed any of its books.
    pub async fn cached_results(&self, term: &str) -> Result<Vec<CachedBook>, Error> {
        let query = normalize_term(term)?;
        let fresh_since = self.policy.expiry_cutoff(Utc::now());
        self.db.books_for_query(&query, fresh_since).await
    }

    /// One cached book by key.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an empty key and `Error::NotFound`
    /// when no row has that key.
    pub async fn get_book(&self, book_key: &str) -> Result<CachedBook, Error> {
        let book_key = book_key.trim();
        if book_key.is_empty() {
            return Err(Error::InvalidInput("book key cannot be empty".to_string()));
        }
        self.db
            .get_book(book_key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no cached book with key {book_key:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::cache::books::sample_books;
    use chrono::Duration;

    async fn manager() -> BookCacheManager {
        BookCacheManager::new(CacheDb::open_in_memory().await.unwrap(), CachePolicy::default())
    }

    #[tokio::test]
    async fn test_empty_cache_stats() {
        let manager = manager().await;
        let stats = manager.get_cache_stats().await.unwrap();
        assert_eq!(stats.total_books, 0);
        assert_eq!(stats.unique_search_terms, 0);
        assert!(stats.oldest_entry.is_none());
        assert!(stats.newest_entry.is_none());

        let health = manager.cache_health().await.unwrap();
        assert!(health.cache_healthy);
        assert!(!health.needs_cleanup);
    }

    #[tokio::test]
    async fn test_repeated_search_increments_single_entry() {
        let manager = manager().await;
        let books = sample_books("dune", 3);

        let mut last = 0;
        for term in ["Dune", "  dune ", "DUNE"] {
            let recorded = manager.record_search(term, &books).await.unwrap();
            assert!(recorded.query.search_count > last);
            last = recorded.query.search_count;
        }

        let stats = manager.get_cache_stats().await.unwrap();
        assert_eq!(stats.unique_search_terms, 1);
        assert_eq!(stats.total_books, 3);

        let entry = manager.db().get_search_query("dune").await.unwrap().unwrap();
        assert_eq!(entry.search_count, 3);
        assert_eq!(entry.result_count, 9);
    }

    #[tokio::test]
    async fn test_record_search_rejects_empty_term() {
        let manager = manager().await;
        let err = manager.record_search("   ", &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_popular_searches_limit() {
        let manager = manager().await;
        for i in 0..15 {
            let term = format!("term {i}");
            for _ in 0..=i {
                manager.record_search(&term, &[]).await.unwrap();
            }
        }

        let top3 = manager.get_popular_searches(Some(3)).await.unwrap();
        assert_eq!(top3.len(), 3);
        assert_eq!(top3[0].query, "term 14");
        assert!(top3.windows(2).all(|w| w[0].search_count >= w[1].search_count));

        let default = manager.get_popular_searches(None).await.unwrap();
        assert_eq!(default.len(), 10);
        for bad in [Some(0), Some(-5)] {
            assert_eq!(manager.get_popular_searches(bad).await.unwrap(), default);
        }
        let parsed = manager.policy().parse_popular_limit(Some("lots"));
        assert_eq!(manager.get_popular_searches(Some(i64::from(parsed))).await.unwrap(), default);
    }

    #[tokio::test]
    async fn test_cleanup_expired_only() {
        let manager = manager().await;
        let now = Utc::now();

        manager
            .record_search_at("old", &sample_books("old", 300), now - Duration::days(8))
            .await
            .unwrap();
        manager
            .record_search_at("new", &sample_books("new", 9_200), now - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(manager.get_cache_stats().await.unwrap().total_books, 9_500);

        let report = manager.cleanup_cache_at(now).await.unwrap();
        assert_eq!(report, CleanupReport { removed: 300, old_removed: 0 });

        let stats = manager.get_cache_stats().await.unwrap();
        assert_eq!(stats.total_books, 9_200);
        assert!(stats.oldest_entry.unwrap() >= manager.policy().expiry_cutoff(now));
        // ledger entries survive cleanup
        assert_eq!(stats.unique_search_terms, 2);
    }

    #[tokio::test]
    async fn test_cleanup_trims_to_hard_ceiling() {
        let manager = manager().await;
        let now = Utc::now();

        manager
            .record_search_at("expired", &sample_books("expired", 500), now - Duration::days(30))
            .await
            .unwrap();
        manager
            .record_search_at("older", &sample_books("older", 1_500), now - Duration::hours(2))
            .await
            .unwrap();
        manager
            .record_search_at("newer", &sample_books("newer", 10_000), now - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(manager.get_cache_stats().await.unwrap().total_books, 12_000);

        let report = manager.cleanup_cache_at(now).await.unwrap();
        assert_eq!(report, CleanupReport { removed: 500, old_removed: 1_500 });
        assert_eq!(report.total(), 2_000);

        let stats = manager.get_cache_stats().await.unwrap();
        assert_eq!(stats.total_books, 10_000);
        assert!(manager.db().books_for_query("older", now - Duration::days(1)).await.unwrap().is_empty());
        assert_eq!(
            manager.db().books_for_query("newer", now - Duration::days(1)).await.unwrap().len(),
            10_000
        );
    }

    #[tokio::test]
    async fn test_cleanup_spares_rows_after_snapshot() {
        let policy = CachePolicy { hard_ceiling: 5, soft_ceiling: 4, ..Default::default() };
        let manager = BookCacheManager::new(CacheDb::open_in_memory().await.unwrap(), policy);
        let snapshot = Utc::now() - Duration::minutes(10);

        manager
            .record_search_at("before", &sample_books("before", 4), snapshot - Duration::minutes(1))
            .await
            .unwrap();
        manager
            .record_search_at("after", &sample_books("after", 6), Utc::now())
            .await
            .unwrap();

        let report = manager.cleanup_cache_at(snapshot).await.unwrap();
        assert_eq!(report, CleanupReport { removed: 0, old_removed: 0 });
        assert_eq!(manager.get_cache_stats().await.unwrap().total_books, 10);
    }

    #[tokio::test]
    async fn test_cached_results_and_get_book() {
        let manager = manager().await;
        let books = sample_books("emma", 2);
        manager.record_search("Emma", &books).await.unwrap();

        let cached = manager.cached_results("  EMMA").await.unwrap();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[0].book, books[0]);

        let one = manager.get_book(&books[1].book_key()).await.unwrap();
        assert_eq!(one.book, books[1]);
        assert_eq!(one.search_query, "emma");

        let missing = manager.get_book("test:nope").await.unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        let empty = manager.get_book(" ").await.unwrap_err();
        assert_eq!(empty.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_cache_hit_does_not_extend_expiry() {
        let manager = manager().await;
        let now = Utc::now();
        let books = sample_books("dune", 3);

        manager
            .record_search_at("dune", &books, now - Duration::days(6))
            .await
            .unwrap();
        assert_eq!(manager.cached_results("dune").await.unwrap().len(), 3);

        let entry = manager.record_cache_hit_at("Dune", 3, now).await.unwrap();
        assert_eq!(entry.search_count, 2);
        assert_eq!(entry.result_count, 6);

        let cached = manager.get_book(&books[0].book_key()).await.unwrap();
        assert!(cached.cached_at < now - Duration::days(5));

        let report = manager.cleanup_cache_at(now + Duration::days(1) + Duration::minutes(1)).await.unwrap();
        assert_eq!(report.removed, 3);
        assert!(manager.cached_results("dune").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cache_hit_rejects_empty_term() {
        let manager = manager().await;
        let err = manager.record_cache_hit(" ", 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_closed_store_is_unavailable() {
        let manager = manager().await;
        let other = manager.clone();
        manager.close().await.unwrap();

        assert!(other.get_cache_stats().await.unwrap_err().is_unavailable());
        assert!(other.cleanup_cache().await.unwrap_err().is_unavailable());
        assert!(other.get_popular_searches(None).await.unwrap_err().is_unavailable());
    }
}
