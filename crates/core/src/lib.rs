//! Core types and shared functionality for bibliocache.
//!
//! This crate provides:
//! - Book cache and search-query ledger with SQLite backend
//! - The book cache manager (stats, popularity, cleanup, recording)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{
    BookCacheManager, BookResult, CacheDb, CacheHealth, CachePolicy, CacheStats, CachedBook, CleanupReport,
    RecordedSearch, SearchAnalytics, SearchQuery,
};
pub use config::{AppConfig, ConfigError};
pub use error::{Error, ErrorKind};
