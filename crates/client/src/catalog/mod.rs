//! Open Library search client.
//!
//! Provides a client for the Open Library search API with rate limiting,
//! request validation, and response normalization into [`BookResult`]s.
//!
//! ### Specification
//!
//! - **Endpoint**: `{base_url}/search.json?q=…&limit=…&fields=…`
//! - **Authentication**: none; requests identify themselves via User-Agent.
//! - **Rate Limiting**: a minimum interval between requests, shared by all
//!   clones of one client. 429 responses surface as `RateLimited`.
//! - **Normalization**: docs without a title are dropped; the first ISBN and
//!   up to ten subjects are kept.
//!
//! [`BookResult`]: bibliocache_core::BookResult

pub mod error;
pub mod request;
pub mod response;

pub use error::CatalogError;
pub use request::{CatalogQuery, SEARCH_FIELDS};
pub use response::{CatalogResponse, OpenLibraryResponse};

use async_trait::async_trait;
use reqwest::header;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

/// Default base URL for the Open Library API.
const DEFAULT_BASE_URL: &str = "https://openlibrary.org";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "bibliocache/0.1";

/// Default minimum interval between requests.
const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// A source of book search results.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Run one catalog search.
    async fn search(&self, query: &CatalogQuery) -> Result<CatalogResponse, CatalogError>;
}

/// Catalog client configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL (default: https://openlibrary.org).
    pub base_url: String,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
    /// User-agent string (default: bibliocache/0.x).
    pub user_agent: String,
    /// Minimum spacing between requests (default: 1s).
    pub min_interval: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }
}

impl From<&bibliocache_core::AppConfig> for CatalogConfig {
    fn from(config: &bibliocache_core::AppConfig) -> Self {
        Self {
            base_url: config.catalog_base_url.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            min_interval: config.catalog_min_interval(),
        }
    }
}

/// Rate limiter to enforce request intervals.
#[derive(Debug)]
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self { last_request: Mutex::new(None), min_interval }
    }

    /// Acquire permission to make a request, waiting if necessary.
    async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Open Library search client.
#[derive(Debug, Clone)]
pub struct OpenLibraryClient {
    http: reqwest::Client,
    search_url: Url,
    rate_limiter: Arc<RateLimiter>,
}

impl OpenLibraryClient {
    /// Create a new client with the given configuration.
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        let search_url = Url::parse(&format!("{}/search.json", config.base_url.trim_end_matches('/')))
            .map_err(|e| CatalogError::InvalidBaseUrl(format!("{}: {e}", config.base_url)))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| CatalogError::Network(Arc::new(e)))?;

        Ok(Self { http, search_url, rate_limiter: Arc::new(RateLimiter::new(config.min_interval)) })
    }

    /// Resolved search endpoint.
    pub fn search_url(&self) -> &Url {
        &self.search_url
    }
}

#[async_trait]
impl Catalog for OpenLibraryClient {
    /// Execute a catalog search.
    ///
    /// This method handles rate limiting, request validation, and response normalization.
    async fn search(&self, req: &CatalogQuery) -> Result<CatalogResponse, CatalogError> {
        req.validate()?;

        self.rate_limiter.acquire().await;

        let start = Instant::now();
        tracing::debug!(query = %req.q, url = %self.search_url, "searching catalog");

        let http_response = self
            .http
            .get(self.search_url.clone())
            .header(header::ACCEPT, "application/json")
            .query(req)
            .query(&[("fields", SEARCH_FIELDS)])
            .send()
            .await?;

        let status = http_response.status();
        tracing::debug!(%status, "catalog response status");

        if status == 429 {
            return Err(CatalogError::RateLimited);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(CatalogError::HttpError { status: status.as_u16() });
        }

        let bytes = http_response.bytes().await?;
        let api_response: OpenLibraryResponse =
            serde_json::from_slice(&bytes).map_err(|e| CatalogError::Parse(e.to_string()))?;

        let response = CatalogResponse::from(api_response);
        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            results = response.result_count(),
            total_found = response.total_found,
            "catalog search completed"
        );

        Ok(response)
    }
}
