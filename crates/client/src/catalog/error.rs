//! Catalog client error types.

use std::sync::Arc;

/// Errors from the book catalog client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    /// Base URL could not be parsed.
    #[error("invalid catalog base URL: {0}")]
    InvalidBaseUrl(String),

    /// Invalid search query.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Invalid limit parameter (must be 1-100).
    #[error("invalid limit: must be 1-100")]
    InvalidLimit,

    /// Rate limited by the catalog.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl CatalogError {
    /// True for errors caused by the request itself rather than the catalog.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, CatalogError::InvalidQuery(_) | CatalogError::InvalidLimit)
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { CatalogError::Timeout } else { CatalogError::Network(Arc::new(err)) }
    }
}
