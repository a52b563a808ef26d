//! OAuth2 access token cache with expiry-aware refresh.
//!
//! Tokens are keyed by client id. A token is reused until it is within the
//! refresh margin of its expiry; after that the next caller authenticates
//! again and replaces the entry.

use crate::error::{StoreError, StoreResult, TransportError};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Default time before expiry at which a cached token is refreshed.
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(10 * 60);

/// Client-credentials token response.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// Bearer token, absent or empty when the vault issued none
    #[serde(default, alias = "access_token")]
    pub access_token: Option<String>,
    /// Token lifetime in seconds
    #[serde(default, alias = "expires_in")]
    pub expires_in: u64,
}

impl TokenResponse {
    /// Create a response.
    #[must_use]
    pub fn new(access_token: impl Into<String>, expires_in: u64) -> Self {
        Self {
            access_token: Some(access_token.into()),
            expires_in,
        }
    }
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Performs the OAuth2 client-credentials exchange.
#[async_trait]
pub trait TokenService: Send + Sync {
    /// Exchange client credentials for an access token.
    async fn authenticate(
        &self,
        api_root: &Url,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<TokenResponse, TransportError>;
}

/// A token held by the cache.
#[derive(Debug)]
pub struct CachedToken {
    access_token: SecretString,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Create a token expiring at `expires_at`.
    #[must_use]
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            expires_at,
        }
    }

    /// Create a token expiring `expires_in` seconds from now.
    #[must_use]
    pub fn expiring_in(access_token: impl Into<String>, expires_in: u64) -> Self {
        let lifetime = TimeDelta::seconds(i64::from(u32::try_from(expires_in).unwrap_or(u32::MAX)));
        Self::new(access_token, Utc::now() + lifetime)
    }

    /// Bearer token.
    #[must_use]
    pub const fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    /// Expiry instant reported by the vault.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the token can still be used at `now` given `margin`.
    #[must_use]
    pub fn is_fresh_at(&self, now: DateTime<Utc>, margin: TimeDelta) -> bool {
        self.expires_at
            .checked_sub_signed(margin)
            .is_some_and(|refresh_at| now < refresh_at)
    }
}

/// Concurrent token cache keyed by client id.
///
/// Entries are immutable and replaced whole, so readers never observe a
/// partially written token. Concurrent refreshes of one key are allowed;
/// the last write wins.
#[derive(Debug)]
pub struct TokenCache {
    entries: RwLock<HashMap<String, Arc<CachedToken>>>,
    refresh_margin: TimeDelta,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCache {
    /// Create an empty cache with the default refresh margin.
    #[must_use]
    pub fn new() -> Self {
        Self::with_refresh_margin(DEFAULT_REFRESH_MARGIN)
    }

    /// Create an empty cache with a custom refresh margin.
    ///
    /// Margins beyond [`TimeDelta::MAX`] are clamped to it, so every cached
    /// token is treated as stale.
    #[must_use]
    pub fn with_refresh_margin(margin: Duration) -> Self {
        let refresh_margin = TimeDelta::from_std(margin).unwrap_or(TimeDelta::MAX);
        Self {
            entries: RwLock::new(HashMap::new()),
            refresh_margin,
        }
    }

    /// Refresh margin in effect.
    #[must_use]
    pub const fn refresh_margin(&self) -> TimeDelta {
        self.refresh_margin
    }

    /// Cached entry for `client_id`, fresh or not.
    #[must_use]
    pub fn get(&self, client_id: &str) -> Option<Arc<CachedToken>> {
        self.entries.read().get(client_id).cloned()
    }

    /// Store `token` for `client_id`, replacing any previous entry.
    pub fn insert(&self, client_id: &str, token: CachedToken) -> Arc<CachedToken> {
        let token = Arc::new(token);
        self.entries
            .write()
            .insert(client_id.to_string(), Arc::clone(&token));
        token
    }

    /// Number of cached client ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Return a valid token for `client_id`, authenticating when the cached
    /// one is missing or within the refresh margin of expiry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfiguration`] when the vault issues no
    /// token or rejects the credentials, and the mapped transport error for
    /// any other authentication failure.
    #[instrument(skip_all, fields(client_id = %client_id))]
    pub async fn get_token(
        &self,
        api_root: &Url,
        client_id: &str,
        client_secret: &SecretString,
        service: &dyn TokenService,
    ) -> StoreResult<Arc<CachedToken>> {
        if let Some(token) = self.get(client_id) {
            if token.is_fresh_at(Utc::now(), self.refresh_margin) {
                debug!("Using cached access token");
                return Ok(token);
            }
        }

        let response = service
            .authenticate(api_root, client_id, client_secret)
            .await
            .map_err(StoreError::from_token_transport)?;

        let access_token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(StoreError::unable_to_authenticate)?;

        let token = self.insert(
            client_id,
            CachedToken::expiring_in(access_token, response.expires_in),
        );
        info!(expires_at = %token.expires_at(), "Authenticated with DevOps Secrets Vault");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use secrecy::ExposeSecret;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTokenService {
        calls: AtomicUsize,
        response: Result<TokenResponse, u16>,
    }

    impl CountingTokenService {
        fn issuing(token: &str, expires_in: u64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Ok(TokenResponse::new(token, expires_in)),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Err(status),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenService for CountingTokenService {
        async fn authenticate(
            &self,
            _api_root: &Url,
            _client_id: &str,
            _client_secret: &SecretString,
        ) -> Result<TokenResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response
                .clone()
                .map_err(|status| TransportError::from_status(status, "rejected"))
        }
    }

    fn api_root() -> Url {
        Url::parse("https://tenant.example.com/v1").unwrap()
    }

    fn secret() -> SecretString {
        SecretString::from("client-secret".to_string())
    }

    #[tokio::test]
    async fn test_fresh_token_is_reused() {
        let cache = TokenCache::new();
        cache.insert(
            "client",
            CachedToken::new("cached", Utc::now() + TimeDelta::minutes(30)),
        );
        let service = CountingTokenService::issuing("new", 3600);

        let token = cache
            .get_token(&api_root(), "client", &secret(), &service)
            .await
            .unwrap();

        assert_eq!(token.access_token().expose_secret(), "cached");
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_near_expiry_token_is_refreshed_once() {
        let cache = TokenCache::new();
        cache.insert(
            "client",
            CachedToken::new("stale", Utc::now() + TimeDelta::minutes(5)),
        );
        let service = CountingTokenService::issuing("fresh", 3600);

        let token = cache
            .get_token(&api_root(), "client", &secret(), &service)
            .await
            .unwrap();
        assert_eq!(token.access_token().expose_secret(), "fresh");
        assert_eq!(service.calls(), 1);

        let cached = cache.get("client").unwrap();
        assert_eq!(cached.access_token().expose_secret(), "fresh");

        cache
            .get_token(&api_root(), "client", &secret(), &service)
            .await
            .unwrap();
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed() {
        let cache = TokenCache::new();
        cache.insert(
            "client",
            CachedToken::new("expired", Utc::now() - TimeDelta::minutes(1)),
        );
        let service = CountingTokenService::issuing("fresh", 3600);

        cache
            .get_token(&api_root(), "client", &secret(), &service)
            .await
            .unwrap();
        assert_eq!(service.calls(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_short_lived_token_is_never_reused() {
        let cache = TokenCache::new();
        let service = CountingTokenService::issuing("brief", 60);

        cache
            .get_token(&api_root(), "client", &secret(), &service)
            .await
            .unwrap();
        cache
            .get_token(&api_root(), "client", &secret(), &service)
            .await
            .unwrap();
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_token_is_invalid_configuration() {
        let cache = TokenCache::new();
        let service = CountingTokenService::issuing("", 3600);

        let err = cache
            .get_token(&api_root(), "client", &secret(), &service)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_missing_token_is_invalid_configuration() {
        let cache = TokenCache::new();
        let service = CountingTokenService {
            calls: AtomicUsize::new(0),
            response: Ok(TokenResponse {
                access_token: None,
                expires_in: 3600,
            }),
        };

        let err = cache
            .get_token(&api_root(), "client", &secret(), &service)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let cache = TokenCache::new();

        let err = cache
            .get_token(&api_root(), "client", &secret(), &CountingTokenService::failing(401))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);

        let err = cache
            .get_token(&api_root(), "client", &secret(), &CountingTokenService::failing(503))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Generic);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers() {
        let cache = Arc::new(TokenCache::new());
        let service = Arc::new(CountingTokenService::issuing("shared", 3600));

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let cache = Arc::clone(&cache);
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    let client_id = format!("client-{}", i % 4);
                    cache
                        .get_token(&api_root(), &client_id, &secret(), service.as_ref())
                        .await
                        .map(|t| t.access_token().expose_secret().to_string())
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "shared");
        }
        assert_eq!(cache.len(), 4);
        assert!(service.calls() >= 4);
    }

    #[test]
    fn test_freshness_margin() {
        let now = Utc::now();
        let margin = TimeDelta::minutes(10);

        assert!(CachedToken::new("t", now + TimeDelta::minutes(11)).is_fresh_at(now, margin));
        assert!(!CachedToken::new("t", now + TimeDelta::minutes(10)).is_fresh_at(now, margin));
        assert!(!CachedToken::new("t", now + TimeDelta::minutes(9)).is_fresh_at(now, margin));
    }

    #[test]
    fn test_custom_refresh_margin() {
        let cache = TokenCache::with_refresh_margin(Duration::from_secs(30));
        assert_eq!(cache.refresh_margin(), TimeDelta::seconds(30));
        assert_eq!(TokenCache::default().refresh_margin(), TimeDelta::minutes(10));
    }

    #[test]
    fn test_out_of_range_margin_clamps_to_max() {
        let cache = TokenCache::with_refresh_margin(Duration::MAX);
        assert_eq!(cache.refresh_margin(), TimeDelta::MAX);

        let token = CachedToken::new("t", Utc::now() + TimeDelta::days(365));
        assert!(!token.is_fresh_at(Utc::now(), cache.refresh_margin()));
    }

    #[test]
    fn test_token_response_debug_redacts() {
        let response = TokenResponse::new("bearer-value", 3600);
        let debug = format!("{response:?}");
        assert!(!debug.contains("bearer-value"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_token_response_wire_names() {
        let camel: TokenResponse =
            serde_json::from_str(r#"{"accessToken":"a","expiresIn":60,"tokenType":"bearer"}"#)
                .unwrap();
        assert_eq!(camel.access_token.as_deref(), Some("a"));
        assert_eq!(camel.expires_in, 60);

        let snake: TokenResponse =
            serde_json::from_str(r#"{"access_token":"b","expires_in":120}"#).unwrap();
        assert_eq!(snake.access_token.as_deref(), Some("b"));
        assert_eq!(snake.expires_in, 120);
    }
}
