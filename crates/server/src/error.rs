//! Structured HTTP errors for the bibliocache server.
//!
//! Cache errors map by [`ErrorKind`]; catalog errors map to gateway-style
//! statuses. Internal errors are logged in full and answered generically.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bibliocache_client::CatalogError;
use bibliocache_core::{Error, ErrorKind};
use serde::{Deserialize, Serialize};

/// Seconds clients are told to wait before retrying an unavailable cache.
const RETRY_AFTER_SECS: &str = "5";

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Errors a route handler can return.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Cache(#[from] Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ApiError {
    /// Status code and stable error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Cache(e) => match e.kind() {
                ErrorKind::Validation => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                ErrorKind::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "CACHE_UNAVAILABLE"),
                ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
            },
            ApiError::Catalog(e) if e.is_invalid_request() => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            ApiError::Catalog(CatalogError::Timeout) => (StatusCode::GATEWAY_TIMEOUT, "CATALOG_TIMEOUT"),
            ApiError::Catalog(CatalogError::RateLimited) => (StatusCode::TOO_MANY_REQUESTS, "CATALOG_RATE_LIMITED"),
            ApiError::Catalog(_) => (StatusCode::BAD_GATEWAY, "CATALOG_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal error");
            "internal error".to_string()
        } else {
            tracing::debug!(error = %self, %status, "request failed");
            self.to_string()
        };

        let mut response = (status, Json(ErrorBody { error: code.to_string(), message })).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
        }
        response
    }
}
