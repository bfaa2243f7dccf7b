//! bibliocache server entry point.
//!
//! Loads layered configuration and serves the book cache over HTTP.
//! Logs are JSON on stderr.

use anyhow::Result;
use bibliocache_core::AppConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        staleness_days = config.cache.staleness_days,
        hard_ceiling = config.cache.hard_ceiling,
        "starting bibliocache"
    );

    bibliocache_server::run(config).await
}
