//! Shared fixtures for route tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bibliocache_client::{Catalog, CatalogError, CatalogQuery, CatalogResponse};
use bibliocache_core::{BookCacheManager, BookResult, CacheDb, CachePolicy};
use bibliocache_server::{AppState, create_router};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

/// Catalog double that returns canned books and counts its calls.
pub struct StubCatalog {
    pub books: Vec<BookResult>,
    pub failure: Option<CatalogError>,
    pub calls: AtomicUsize,
}

impl StubCatalog {
    pub fn with_books(books: Vec<BookResult>) -> Self {
        Self { books, failure: None, calls: AtomicUsize::new(0) }
    }

    pub fn failing(error: CatalogError) -> Self {
        Self { books: Vec::new(), failure: Some(error), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Catalog for StubCatalog {
    async fn search(&self, query: &CatalogQuery) -> Result<CatalogResponse, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let results: Vec<BookResult> = self.books.iter().take(query.get_limit() as usize).cloned().collect();
        Ok(CatalogResponse { total_found: self.books.len() as u64, results })
    }
}

pub fn book(id: &str, title: &str) -> BookResult {
    BookResult {
        source: "openlibrary".to_string(),
        source_id: Some(format!("/works/{id}")),
        title: title.to_string(),
        author: Some("Frank Herbert".to_string()),
        first_publish_year: Some(1965),
        ..Default::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub manager: BookCacheManager,
    pub catalog: Arc<StubCatalog>,
}

pub async fn app_with(catalog: StubCatalog, policy: CachePolicy) -> TestApp {
    let db = CacheDb::open_in_memory().await.unwrap();
    let manager = BookCacheManager::new(db, policy);
    let catalog = Arc::new(catalog);
    let state = AppState::new(manager.clone(), catalog.clone(), 20);
    TestApp { router: create_router(state), manager, catalog }
}

pub async fn app() -> TestApp {
    app_with(StubCatalog::with_books(Vec::new()), CachePolicy::default()).await
}

pub async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, "GET", uri).await
}
