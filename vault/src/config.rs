//! Secure store configuration.
//!
//! Loaded from environment variables (and a `.env` file when present) and
//! validated before use.

use crate::token::{DEFAULT_REFRESH_MARGIN, TokenCache};
use dsv_common::{HttpConfig, TracingConfig, http::DEFAULT_TIMEOUT};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid timeout value
    #[error("Invalid request timeout: must be greater than 0")]
    InvalidTimeout,

    /// Environment variable parse error
    #[error("Failed to parse environment variable {name}: {reason}")]
    ParseError {
        /// Variable name
        name: String,
        /// Parser message
        reason: String,
    },
}

/// Secure store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Timeout applied to every vault request
    pub request_timeout: Duration,
    /// How long before expiry a cached token is refreshed
    pub token_refresh_margin: Duration,
    /// User agent sent to the vault
    pub user_agent: String,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit logs as JSON
    pub log_json: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_TIMEOUT,
            token_refresh_margin: DEFAULT_REFRESH_MARGIN,
            user_agent: default_user_agent(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable does not parse or a value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Self {
            request_timeout: Duration::from_millis(parse_env(
                "DSV_REQUEST_TIMEOUT_MS",
                duration_millis(DEFAULT_TIMEOUT),
            )?),
            token_refresh_margin: Duration::from_secs(parse_env(
                "DSV_TOKEN_REFRESH_MARGIN_SECS",
                DEFAULT_REFRESH_MARGIN.as_secs(),
            )?),
            user_agent: env::var("DSV_USER_AGENT").unwrap_or_else(|_| default_user_agent()),
            log_level: env::var("DSV_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: parse_env("DSV_LOG_JSON", false)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the token refresh margin.
    #[must_use]
    pub const fn with_token_refresh_margin(mut self, margin: Duration) -> Self {
        self.token_refresh_margin = margin;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }

    /// HTTP client settings for the vault transport.
    #[must_use]
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig::default()
            .with_timeout(self.request_timeout)
            .with_user_agent(&self.user_agent)
    }

    /// Tracing subscriber settings.
    #[must_use]
    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig::default()
            .with_log_level(&self.log_level)
            .with_json_output(self.log_json)
    }

    /// An empty token cache honoring the configured refresh margin.
    #[must_use]
    pub fn token_cache(&self) -> TokenCache {
        TokenCache::with_refresh_margin(self.token_refresh_margin)
    }
}

fn default_user_agent() -> String {
    concat!("dsv-secure-store/", env!("CARGO_PKG_VERSION")).to_string()
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Parse an environment variable with a default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.parse().map_err(|e: T::Err| ConfigError::ParseError {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        assert_eq!(config.token_refresh_margin, Duration::from_secs(600));
        assert!(config.user_agent.starts_with("dsv-secure-store/"));
        assert!(!config.log_json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = StoreConfig::default().with_request_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTimeout)));
    }

    #[test]
    fn test_parse_env_default() {
        let value: u64 = parse_env("DSV_TEST_NONEXISTENT_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_derived_configs() {
        let config = StoreConfig::default()
            .with_request_timeout(Duration::from_millis(750))
            .with_token_refresh_margin(Duration::from_secs(60));

        let http = config.http_config();
        assert_eq!(http.timeout, Duration::from_millis(750));
        assert_eq!(http.user_agent, config.user_agent);

        assert_eq!(config.tracing_config().log_level, "info");
        assert_eq!(config.token_cache().refresh_margin(), TimeDelta::seconds(60));
    }
}
