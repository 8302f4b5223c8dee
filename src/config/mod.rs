use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::clustering::ThresholdScaling;
use crate::errors::{AppError, AppResult};

pub mod defaults;
pub mod duration_serde;

use defaults::*;
use duration_serde::parse_default;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
}

/// Remote catalog connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout", with = "duration_serde::duration")]
    pub request_timeout: Duration,
    #[serde(default = "default_connect_timeout", with = "duration_serde::duration")]
    pub connect_timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Sent as a bearer token when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Minimum spacing between outbound requests, zero disables
    #[serde(default = "default_min_request_interval", with = "duration_serde::duration")]
    pub min_request_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_search_ttl", with = "duration_serde::duration")]
    pub search_ttl: Duration,
    #[serde(default = "default_search_capacity")]
    pub search_capacity: usize,
    #[serde(default = "default_game_ttl", with = "duration_serde::duration")]
    pub game_ttl: Duration,
    #[serde(default = "default_game_capacity")]
    pub game_capacity: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusteringConfig {
    #[serde(default)]
    pub scaling: ThresholdScaling,
}

fn default_base_url() -> String {
    DEFAULT_CATALOG_BASE_URL.to_string()
}

fn default_request_timeout() -> Duration {
    parse_default(DEFAULT_REQUEST_TIMEOUT)
}

fn default_connect_timeout() -> Duration {
    parse_default(DEFAULT_CONNECT_TIMEOUT)
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn default_min_request_interval() -> Duration {
    parse_default(DEFAULT_MIN_REQUEST_INTERVAL)
}

fn default_search_ttl() -> Duration {
    parse_default(DEFAULT_SEARCH_TTL)
}

fn default_search_capacity() -> usize {
    DEFAULT_SEARCH_CAPACITY
}

fn default_game_ttl() -> Duration {
    parse_default(DEFAULT_GAME_TTL)
}

fn default_game_capacity() -> usize {
    DEFAULT_GAME_CAPACITY
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
            api_token: None,
            min_request_interval: default_min_request_interval(),
        }
    }
}

impl CatalogConfig {
    /// Parsed base URL of the catalog API
    pub fn base_url(&self) -> AppResult<Url> {
        let url = Url::parse(self.base_url.trim()).map_err(|e| {
            AppError::configuration(format!("Invalid catalog base_url '{}': {e}", self.base_url))
        })?;
        match url.scheme() {
            "http" | "https" if !url.cannot_be_a_base() => Ok(url),
            scheme => Err(AppError::configuration(format!(
                "Catalog base_url must be an http(s) URL, got scheme '{scheme}'"
            ))),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            search_ttl: default_search_ttl(),
            search_capacity: default_search_capacity(),
            game_ttl: default_game_ttl(),
            game_capacity: default_game_capacity(),
        }
    }
}

impl CacheConfig {
    pub fn search_capacity(&self) -> AppResult<NonZeroUsize> {
        non_zero("cache.search_capacity", self.search_capacity)
    }

    pub fn game_capacity(&self) -> AppResult<NonZeroUsize> {
        non_zero("cache.game_capacity", self.game_capacity)
    }
}

fn non_zero(field: &str, value: usize) -> AppResult<NonZeroUsize> {
    NonZeroUsize::new(value)
        .ok_or_else(|| AppError::configuration(format!("{field} must be greater than zero")))
}

impl Config {
    /// Load from the file named by `MEEPLE_CONFIG`, falling back to `meeple.toml`
    pub fn load() -> AppResult<Self> {
        let config_file =
            std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from_file(&config_file)
    }

    /// Layer defaults, then `config_file` if it exists, then `MEEPLE_*` env vars.
    ///
    /// Nested keys use a double underscore, e.g. `MEEPLE_CACHE__GAME_TTL=30m`.
    pub fn load_from_file(config_file: &str) -> AppResult<Self> {
        if !Path::new(config_file).exists() {
            info!("Config file {} not found, using defaults", config_file);
        }

        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| AppError::configuration(format!("Failed to load configuration: {e}")))?;

        config.validate()?;
        info!("Configuration loaded (catalog at {})", config.catalog.base_url);
        Ok(config)
    }

    /// Reject settings the catalog client cannot run with
    pub fn validate(&self) -> AppResult<()> {
        self.catalog.base_url()?;
        if self.catalog.request_timeout.is_zero() {
            return Err(AppError::configuration(
                "catalog.request_timeout must be greater than zero",
            ));
        }
        if self.catalog.connect_timeout.is_zero() {
            return Err(AppError::configuration(
                "catalog.connect_timeout must be greater than zero",
            ));
        }
        self.cache.search_capacity()?;
        self.cache.game_capacity()?;
        Ok(())
    }

    /// Render as TOML, e.g. to seed a config file
    pub fn to_toml_string(&self) -> AppResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AppError::internal(format!("Failed to render configuration: {e}")))
    }
}
