//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (BIBLIOCACHE_*)
//! 2. TOML config file (if BIBLIOCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::CachePolicy;

mod validation;

pub use validation::ConfigError;

/// Environment variable prefix for all settings.
pub const ENV_PREFIX: &str = "BIBLIOCACHE_";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (BIBLIOCACHE_*), nested keys joined with `__`
/// 2. TOML config file (if BIBLIOCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via BIBLIOCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Socket address the HTTP server binds to.
    ///
    /// Set via BIBLIOCACHE_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// User-Agent string for catalog requests.
    ///
    /// Set via BIBLIOCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Catalog HTTP request timeout in milliseconds.
    ///
    /// Set via BIBLIOCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Bound on a single cache store call in milliseconds.
    ///
    /// Set via BIBLIOCACHE_STORE_TIMEOUT_MS environment variable.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Base URL of the book catalog.
    ///
    /// Set via BIBLIOCACHE_CATALOG_BASE_URL environment variable.
    #[serde(default = "default_catalog_base_url")]
    pub catalog_base_url: String,

    /// Minimum spacing between catalog requests in milliseconds.
    ///
    /// Set via BIBLIOCACHE_CATALOG_MIN_INTERVAL_MS environment variable.
    #[serde(default = "default_catalog_min_interval_ms")]
    pub catalog_min_interval_ms: u64,

    /// Number of results requested per catalog search.
    ///
    /// Set via BIBLIOCACHE_SEARCH_LIMIT environment variable.
    #[serde(default = "default_search_limit")]
    pub search_limit: u8,

    /// Cache lifecycle policy.
    ///
    /// Set via BIBLIOCACHE_CACHE__* environment variables, e.g.
    /// BIBLIOCACHE_CACHE__STALENESS_DAYS.
    #[serde(default)]
    pub cache: CachePolicy,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./bibliocache.sqlite")
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".into()
}

fn default_user_agent() -> String {
    "bibliocache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_store_timeout_ms() -> u64 {
    5_000
}

fn default_catalog_base_url() -> String {
    "https://openlibrary.org".into()
}

fn default_catalog_min_interval_ms() -> u64 {
    1_000
}

fn default_search_limit() -> u8 {
    20
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind_addr: default_bind_addr(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            store_timeout_ms: default_store_timeout_ms(),
            catalog_base_url: default_catalog_base_url(),
            catalog_min_interval_ms: default_catalog_min_interval_ms(),
            search_limit: default_search_limit(),
            cache: CachePolicy::default(),
        }
    }
}

impl AppConfig {
    /// Catalog timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Store call bound as Duration.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Catalog request spacing as Duration.
    pub fn catalog_min_interval(&self) -> Duration {
        Duration::from_millis(self.catalog_min_interval_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `BIBLIOCACHE_`
    /// 2. TOML file from `BIBLIOCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var(format!("{ENV_PREFIX}CONFIG_FILE")) {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed(ENV_PREFIX)
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(&figment)
    }

    /// Extract and validate configuration from a prepared figment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::LoadFailed` if extraction fails, or the
    /// validation error.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
