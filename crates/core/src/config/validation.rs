//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` or `store_timeout_ms` is outside 100ms..=5 minutes
    /// - `user_agent`, `bind_addr` or `catalog_base_url` is empty
    /// - `search_limit` is outside 1..=100
    /// - the cache policy is inconsistent (see below)
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("timeout_ms", self.timeout_ms), ("store_timeout_ms", self.store_timeout_ms)] {
            if value < 100 {
                return Err(invalid(field, "must be at least 100ms"));
            }
            if value > 300_000 {
                return Err(invalid(field, "must not exceed 5 minutes (300000ms)"));
            }
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        if self.bind_addr.is_empty() {
            return Err(invalid("bind_addr", "must not be empty"));
        }
        if self.catalog_base_url.is_empty() {
            return Err(invalid("catalog_base_url", "must not be empty"));
        }

        if !(1..=100).contains(&self.search_limit) {
            return Err(invalid("search_limit", "must be between 1 and 100"));
        }

        let policy = &self.cache;
        if policy.staleness_days == 0 {
            return Err(invalid("cache.staleness_days", "must be at least 1"));
        }
        if policy.hard_ceiling == 0 {
            return Err(invalid("cache.hard_ceiling", "must be greater than 0"));
        }
        if policy.soft_ceiling >= policy.hard_ceiling {
            return Err(invalid("cache.soft_ceiling", "must be below cache.hard_ceiling"));
        }
        if policy.default_popular_limit == 0 {
            return Err(invalid("cache.default_popular_limit", "must be greater than 0"));
        }

        if self.catalog_min_interval_ms == 0 {
            tracing::warn!("catalog_min_interval_ms is 0; catalog requests will not be rate limited");
        }

        Ok(())
    }
}
