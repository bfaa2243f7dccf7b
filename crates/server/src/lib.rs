//! bibliocache-server: HTTP service over the book cache.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;

use std::sync::Arc;

use anyhow::Result;
use bibliocache_client::{CatalogConfig, OpenLibraryClient};
use bibliocache_core::{AppConfig, BookCacheManager, CacheDb};
use tokio::net::TcpListener;

/// Open the store, serve until Ctrl-C, then close the store.
pub async fn run(config: AppConfig) -> Result<()> {
    let db = CacheDb::open(&config.db_path)
        .await?
        .with_timeout(config.store_timeout());
    tracing::info!(db_path = %config.db_path.display(), "opened cache database");

    let manager = BookCacheManager::new(db, config.cache.clone());
    let catalog = OpenLibraryClient::new(CatalogConfig::from(&config))?;
    let state = AppState::new(manager.clone(), Arc::new(catalog), config.search_limit);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down; closing cache database");
    manager.close().await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
