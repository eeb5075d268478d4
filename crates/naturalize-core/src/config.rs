//! Configuration management for the Naturalize admin tooling

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the API base URL
pub const BASE_URL_ENV: &str = "NATURALIZE_API_BASE_URL";

/// Production API host used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "https://mamadou.mtscorporate.com/api/v1";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Credential storage configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every request path is resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds (none when unset)
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Freshness window of the GET cache in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,

    /// Retries used by `request_with_retry` when the caller does not say
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Base retry delay in milliseconds (multiplied by the attempt number)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

/// Credential storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// File holding the bearer token (platform config dir when unset)
    #[serde(default)]
    pub token_file: Option<PathBuf>,

    /// File holding the cached signed-in user record
    #[serde(default)]
    pub user_file: Option<PathBuf>,

    /// Login entry point announced when the session expires
    #[serde(default = "default_login_url")]
    pub login_url: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json or pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

const fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

const fn default_retries() -> u32 {
    3
}

const fn default_retry_delay() -> u64 {
    1000
}

fn default_login_url() -> String {
    "/login".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: None,
            cache_ttl_seconds: default_cache_ttl(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_file: None,
            user_file: None,
            login_url: default_login_url(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ApiConfig {
    /// Get the cache freshness window as Duration
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Get the base retry delay as Duration
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Get the request timeout as Duration, if one is configured
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

impl Config {
    /// Load configuration from `naturalize.toml` (if present) and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded, parsed, or validated.
    pub fn load() -> crate::Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from an explicit file (or the default one) and the environment
    ///
    /// Nested keys come from `NATURALIZE_<SECTION>__<KEY>`; the base URL can
    /// also be given directly through `NATURALIZE_API_BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, a value has the wrong type,
    /// or the resulting configuration fails validation.
    pub fn load_from(path: Option<&Path>) -> crate::Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("naturalize").required(false),
        };

        let mut loaded: Self = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("NATURALIZE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                loaded.api.base_url = base_url;
            }
        }

        loaded.validate()?;
        Ok(loaded)
    }

    /// Check that the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] naming the offending field.
    pub fn validate(&self) -> crate::Result<()> {
        let base = self.api.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(crate::Error::validation(
                "api.base_url",
                format!("expected an http(s) URL, got '{base}'"),
            ));
        }
        if self.api.cache_ttl_seconds == 0 {
            return Err(crate::Error::validation(
                "api.cache_ttl_seconds",
                "freshness window must be at least one second",
            ));
        }
        if self.api.retries > 10 {
            return Err(crate::Error::validation(
                "api.retries",
                "at most 10 retries are allowed",
            ));
        }
        if self.api.timeout_seconds == Some(0) {
            return Err(crate::Error::validation(
                "api.timeout_seconds",
                "timeout must be positive when set",
            ));
        }
        Ok(())
    }
}
