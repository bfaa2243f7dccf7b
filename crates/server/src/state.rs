//! Shared handler state.

use std::sync::Arc;

use bibliocache_client::Catalog;
use bibliocache_core::BookCacheManager;

/// State handed to every route handler.
///
/// Holds no mutable data; cloning shares the store handle and catalog.
#[derive(Clone)]
pub struct AppState {
    pub manager: BookCacheManager,
    pub catalog: Arc<dyn Catalog>,
    /// Results requested from the catalog per search.
    pub search_limit: u8,
}

impl AppState {
    pub fn new(manager: BookCacheManager, catalog: Arc<dyn Catalog>, search_limit: u8) -> Self {
        Self { manager, catalog, search_limit }
    }
}
