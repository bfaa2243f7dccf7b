//! Catalog search request types and validation.

use serde::Serialize;

use crate::catalog::CatalogError;

/// Fields requested from the Open Library search endpoint.
pub const SEARCH_FIELDS: &str = "key,title,author_name,first_publish_year,isbn,cover_i,subject";

/// Search request parameters for the Open Library search API.
///
/// See https://openlibrary.org/dev/docs/api/search
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Free-text query (required, max 200 chars).
    pub q: String,

    /// Number of results (1-100, default 20).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u8>,
}

impl CatalogQuery {
    pub fn new(q: impl Into<String>, limit: u8) -> Self {
        Self { q: q.into(), limit: Some(limit) }
    }

    /// Validate the search request parameters.
    ///
    /// Returns an error if any parameters are out of range or malformed.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let q = self.q.trim();
        if q.is_empty() {
            return Err(CatalogError::InvalidQuery("query cannot be empty".to_string()));
        }

        let chars = q.chars().count();
        if chars > 200 {
            return Err(CatalogError::InvalidQuery(format!("query too long: {chars} chars (max 200)")));
        }

        if let Some(limit) = self.limit
            && !(1..=100).contains(&limit)
        {
            return Err(CatalogError::InvalidLimit);
        }

        Ok(())
    }

    /// Get the effective limit (default 20).
    pub fn get_limit(&self) -> u8 {
        self.limit.unwrap_or(20)
    }
}
