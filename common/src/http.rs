//! HTTP client settings shared by the token and secrets endpoints.
//!
//! Both endpoints sit behind one tenant host, so a single pooled client with
//! one timeout policy serves every vault call.

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Default request timeout for vault calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const POOL_MAX_IDLE_PER_HOST: usize = 4;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whole-request timeout, connect and body included
    pub timeout: Duration,
    /// TCP and TLS handshake timeout, never above `timeout`
    pub connect_timeout: Duration,
    /// Idle pooled connections are closed after this long
    pub pool_idle_timeout: Duration,
    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,
    /// `User-Agent` header value
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_TIMEOUT,
            pool_idle_timeout: POOL_IDLE_TIMEOUT,
            pool_max_idle_per_host: POOL_MAX_IDLE_PER_HOST,
            user_agent: concat!("dsv-common/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    /// Set the request timeout, lowering the connect timeout to match if needed.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.connect_timeout = self.connect_timeout.min(timeout);
        self
    }

    /// Set the connect timeout. Values above the request timeout are capped.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout.min(self.timeout);
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Build a rustls client that asks for JSON on every request.
///
/// # Errors
///
/// Returns an error if TLS initialization fails.
///
/// # Examples
///
/// ```
/// use dsv_common::{HttpConfig, build_http_client};
/// use std::time::Duration;
///
/// let config = HttpConfig::default().with_timeout(Duration::from_secs(5));
/// let client = build_http_client(&config).expect("Failed to build client");
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    ClientBuilder::new()
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .user_agent(config.user_agent.as_str())
        .use_rustls_tls()
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_vault_timeout() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.connect_timeout, config.timeout);
        assert!(config.user_agent.starts_with("dsv-common/"));
    }

    #[test]
    fn test_connect_timeout_never_exceeds_request_timeout() {
        let config = HttpConfig::default().with_timeout(Duration::from_millis(500));
        assert_eq!(config.connect_timeout, Duration::from_millis(500));

        let config = HttpConfig::default().with_timeout(Duration::from_secs(30));
        assert_eq!(config.connect_timeout, DEFAULT_TIMEOUT);

        let config = HttpConfig::default().with_connect_timeout(Duration::from_secs(10));
        assert_eq!(config.connect_timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_build_client() {
        let config = HttpConfig::default().with_user_agent("dsv-store/test");
        assert!(build_http_client(&config).is_ok());
    }
}
