//! Open Library search response types and normalization.

use bibliocache_core::BookResult;
use serde::{Deserialize, Serialize};

/// Source name stored on every normalized result.
pub const SOURCE: &str = "openlibrary";

/// At most this many subjects are kept per book.
const MAX_SUBJECTS: usize = 10;

/// Raw response from the Open Library search API.
#[derive(Debug, Deserialize)]
pub struct OpenLibraryResponse {
    /// The API also sends a legacy `num_found` duplicate; it is ignored.
    #[serde(default, rename = "numFound")]
    pub num_found: u64,
    #[serde(default)]
    pub docs: Vec<OpenLibraryDoc>,
}

/// Individual work from the search results.
#[derive(Debug, Deserialize)]
pub struct OpenLibraryDoc {
    /// Work key, e.g. `/works/OL45883W`.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author_name: Vec<String>,
    #[serde(default)]
    pub first_publish_year: Option<i32>,
    #[serde(default)]
    pub isbn: Vec<String>,
    #[serde(default)]
    pub cover_i: Option<i64>,
    #[serde(default)]
    pub subject: Vec<String>,
}

/// Normalized catalog response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse {
    pub results: Vec<BookResult>,
    /// Total matches the catalog reports, across all pages.
    pub total_found: u64,
}

impl From<OpenLibraryResponse> for CatalogResponse {
    /// Convert the raw response, dropping docs without a usable title.
    fn from(raw: OpenLibraryResponse) -> Self {
        let results = raw
            .docs
            .into_iter()
            .filter_map(|doc| {
                let title = doc.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
                let author = (!doc.author_name.is_empty()).then(|| doc.author_name.join(", "));

                Some(BookResult {
                    source: SOURCE.to_string(),
                    source_id: doc.key,
                    title,
                    author,
                    first_publish_year: doc.first_publish_year,
                    isbn: doc.isbn.into_iter().next(),
                    cover_id: doc.cover_i,
                    subjects: doc.subject.into_iter().take(MAX_SUBJECTS).collect(),
                })
            })
            .collect();

        CatalogResponse { results, total_found: raw.num_found }
    }
}

impl CatalogResponse {
    /// Get the number of results.
    pub fn result_count(&self) -> usize {
        self.results.len()
    }
}
