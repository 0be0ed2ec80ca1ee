//! Configuration loading for coinwatch.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.coinwatch/config.toml` (user)
//! 3. `/etc/coinwatch/config.toml` (system)
//!
//! With no file present, defaults apply. Environment variables override the
//! file afterwards:
//! - `COINGECKO_API_KEY`: API key
//! - `COINWATCH_BASE_URL`: upstream base URL
//! - `COINWATCH_REFRESH_INTERVAL`: listing refresh interval in milliseconds

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::api::{CoinGeckoClient, Currency, DEFAULT_BASE_URL, Endpoints};
use crate::fetch::FetchOrchestrator;
use crate::refresh::RefreshConfig;
use crate::throttle::RequestThrottle;
use crate::{FetchError, Result};

pub const API_KEY_ENV: &str = "COINGECKO_API_KEY";
pub const BASE_URL_ENV: &str = "COINWATCH_BASE_URL";
pub const REFRESH_INTERVAL_ENV: &str = "COINWATCH_REFRESH_INTERVAL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub refresh: RefreshSection,
}

/// Upstream API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL (default: the public CoinGecko v3 API).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Request pipeline settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Per-call deadline in seconds (default: 15).
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Minimum spacing between outbound calls (default: 100).
    #[serde(default = "default_min_interval")]
    pub min_request_interval_ms: u64,
    #[serde(default = "default_true")]
    pub coalesce_in_flight: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_timeout(),
            min_request_interval_ms: default_min_interval(),
            coalesce_in_flight: true,
        }
    }
}

fn default_timeout() -> u64 {
    15
}

fn default_min_interval() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

/// Listing refresh settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshSection {
    /// Polling interval in milliseconds (default: 10000).
    #[serde(default = "default_refresh_interval")]
    pub interval_ms: u64,
    #[serde(default)]
    pub currency: Currency,
}

impl Default for RefreshSection {
    fn default() -> Self {
        Self {
            interval_ms: default_refresh_interval(),
            currency: Currency::default(),
        }
    }
}

fn default_refresh_interval() -> u64 {
    10_000
}

impl Config {
    /// Load configuration from the standard locations, then apply
    /// environment overrides.
    ///
    /// An explicit path must exist. Without one, a missing user and system
    /// file means defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::from_file(&path)?,
            None => {
                debug!("no config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a single file, without environment overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FetchError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let config = Self::parse(&content).map_err(|e| {
            FetchError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(FetchError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".coinwatch").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/coinwatch/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    ///
    /// Blank values are ignored, as is a refresh interval that is not a
    /// positive integer.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = var(API_KEY_ENV) {
            self.api.api_key = Some(key);
        }
        if let Some(base_url) = var(BASE_URL_ENV) {
            self.api.base_url = base_url;
        }
        match var(REFRESH_INTERVAL_ENV).map(|v| v.trim().parse::<u64>()) {
            Some(Ok(ms)) if ms > 0 => self.refresh.interval_ms = ms,
            Some(_) => debug!(var = REFRESH_INTERVAL_ENV, "ignoring invalid refresh interval"),
            None => {}
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api.base_url).map_err(|e| {
            FetchError::Configuration(format!("invalid base_url {:?}: {e}", self.api.base_url))
        })?;
        if self.fetch.request_timeout_secs == 0 {
            return Err(FetchError::Configuration(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.refresh.interval_ms == 0 {
            return Err(FetchError::Configuration(
                "refresh interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.request_timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.fetch.min_request_interval_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh.interval_ms)
    }

    /// Orchestrator with the configured timeout, spacing, key and
    /// coalescing, over the default reqwest transport.
    pub fn orchestrator(&self) -> Result<FetchOrchestrator> {
        FetchOrchestrator::builder()
            .request_timeout(self.request_timeout())
            .throttle(Arc::new(RequestThrottle::with_interval(
                self.min_request_interval(),
            )))
            .api_key(self.api.api_key.clone())
            .coalesce_in_flight(self.fetch.coalesce_in_flight)
            .build()
    }

    pub fn client(&self) -> Result<CoinGeckoClient> {
        Ok(CoinGeckoClient::new(
            self.orchestrator()?,
            Endpoints::new(self.api.base_url.clone()),
        ))
    }

    pub fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            interval: self.refresh_interval(),
            currency: self.refresh.currency,
            ..RefreshConfig::default()
        }
    }
}
