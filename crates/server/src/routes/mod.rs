//! HTTP routes.
//!
//! - `GET  /cache/stats` cache totals, optionally with popular searches
//! - `GET  /cache/cleanup` totals plus health flags
//! - `POST /cache/cleanup` run cleanup
//! - `GET  /books/search` cached-or-catalog book search
//! - `GET  /books/{*key}` one cached book
//! - `GET  /health` liveness

pub mod books;
pub mod cache;

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the HTTP router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/cache/stats", get(cache::stats::stats_handler))
        .route(
            "/cache/cleanup",
            get(cache::cleanup::cleanup_status_handler).post(cache::cleanup::cleanup_handler),
        )
        .route("/books/search", get(books::search_handler))
        .route("/books/{*key}", get(books::get_book_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}
