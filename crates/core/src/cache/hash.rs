//! Cache key generation for cached books.

use sha2::{Digest, Sha256};

/// Key for a book the catalog identifies itself.
pub fn source_book_key(source: &str, source_id: &str) -> String {
    format!("{}:{}", source.trim().to_lowercase(), source_id.trim())
}

/// Content-addressed key for a book without a source identifier.
///
/// Title and author are case-folded and whitespace-collapsed first, so minor
/// formatting differences between searches map to the same row.
pub fn content_book_key(title: &str, author: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fold(title).as_bytes());
    hasher.update(b"\n");
    hasher.update(fold(author.unwrap_or_default()).as_bytes());
    format!("hash:{}", hex::encode(hasher.finalize()))
}

fn fold(s: &str) -> String {
    s.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
