//! Mock implementations of the vault transport services.
//!
//! Both mocks keep their state in memory, record every call, and can be told
//! to fail with a given HTTP status.

use async_trait::async_trait;
use dsv_secure_store::{
    ApiSession, SecretData, SecretRecord, SecretService, TokenResponse, TokenService,
    TransportError,
};
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use url::Url;

/// Mock OAuth2 token endpoint.
///
/// Issues `mock-token-1`, `mock-token-2`, ... on successive calls.
#[derive(Debug)]
pub struct MockTokenService {
    calls: AtomicUsize,
    expires_in: u64,
    empty: bool,
    failure: RwLock<Option<u16>>,
    clients: RwLock<Vec<String>>,
}

impl Default for MockTokenService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTokenService {
    /// Create a service issuing one-hour tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::with_expires_in(3600)
    }

    /// Create a service issuing tokens valid for `expires_in` seconds.
    #[must_use]
    pub fn with_expires_in(expires_in: u64) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            expires_in,
            empty: false,
            failure: RwLock::new(None),
            clients: RwLock::new(Vec::new()),
        }
    }

    /// Create a service that answers with an empty token.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            empty: true,
            ..Self::new()
        }
    }

    /// Make every following call fail with `status`.
    pub async fn fail_with(&self, status: u16) {
        *self.failure.write().await = Some(status);
    }

    /// Number of authentication calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Client ids that authenticated, in call order.
    pub async fn clients(&self) -> Vec<String> {
        self.clients.read().await.clone()
    }
}

#[async_trait]
impl TokenService for MockTokenService {
    async fn authenticate(
        &self,
        _api_root: &Url,
        client_id: &str,
        _client_secret: &SecretString,
    ) -> Result<TokenResponse, TransportError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.clients.write().await.push(client_id.to_string());

        if let Some(status) = *self.failure.read().await {
            return Err(TransportError::from_status(status, "token request rejected"));
        }
        if self.empty {
            return Ok(TokenResponse::new("", self.expires_in));
        }
        Ok(TokenResponse::new(format!("mock-token-{n}"), self.expires_in))
    }
}

/// Secret operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretOp {
    /// Create
    Create,
    /// Get
    Get,
    /// Update
    Update,
    /// Delete
    Delete,
}

/// A recorded secrets call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretCall {
    /// Operation
    pub op: SecretOp,
    /// Slug the operation targeted
    pub slug: String,
}

impl SecretCall {
    /// Create a call record.
    #[must_use]
    pub fn new(op: SecretOp, slug: impl Into<String>) -> Self {
        Self {
            op,
            slug: slug.into(),
        }
    }
}

/// In-memory secrets endpoint.
///
/// Creating an existing slug answers 409; reading, updating or deleting a
/// missing one answers 404.
#[derive(Debug, Default)]
pub struct MockSecretService {
    secrets: RwLock<HashMap<String, SecretData>>,
    calls: RwLock<Vec<SecretCall>>,
    bearers: RwLock<Vec<String>>,
    failures: RwLock<HashMap<SecretOp, u16>>,
    reported_paths: RwLock<HashMap<String, String>>,
}

impl MockSecretService {
    /// Create an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a secret.
    pub async fn insert(&self, slug: &str, data: SecretData) {
        self.secrets.write().await.insert(slug.to_string(), data);
    }

    /// Stored data at `slug`.
    pub async fn data(&self, slug: &str) -> Option<SecretData> {
        self.secrets.read().await.get(slug).cloned()
    }

    /// Check if a secret exists.
    pub async fn exists(&self, slug: &str) -> bool {
        self.secrets.read().await.contains_key(slug)
    }

    /// Number of stored secrets.
    pub async fn len(&self) -> usize {
        self.secrets.read().await.len()
    }

    /// Make every following `op` fail with `status`.
    pub async fn fail(&self, op: SecretOp, status: u16) {
        self.failures.write().await.insert(op, status);
    }

    /// Store secrets created at `slug` under `reported` instead.
    pub async fn report_path(&self, slug: &str, reported: &str) {
        self.reported_paths
            .write()
            .await
            .insert(slug.to_string(), reported.to_string());
    }

    /// All recorded calls, in order.
    pub async fn calls(&self) -> Vec<SecretCall> {
        self.calls.read().await.clone()
    }

    /// Recorded calls of one kind.
    pub async fn calls_of(&self, op: SecretOp) -> Vec<SecretCall> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.op == op)
            .cloned()
            .collect()
    }

    /// Bearer tokens presented, in call order.
    pub async fn bearers(&self) -> Vec<String> {
        self.bearers.read().await.clone()
    }

    async fn record(
        &self,
        op: SecretOp,
        session: &ApiSession,
        slug: &str,
    ) -> Result<(), TransportError> {
        self.calls.write().await.push(SecretCall::new(op, slug));
        self.bearers.write().await.push(session.bearer().to_string());

        match self.failures.read().await.get(&op) {
            Some(&status) => Err(TransportError::from_status(status, "injected failure")),
            None => Ok(()),
        }
    }
}

fn not_found(slug: &str) -> TransportError {
    TransportError::from_status(404, format!("no secret at {slug}"))
}

#[async_trait]
impl SecretService for MockSecretService {
    async fn create_secret(
        &self,
        session: &ApiSession,
        slug: &str,
        data: &SecretData,
    ) -> Result<SecretRecord, TransportError> {
        self.record(SecretOp::Create, session, slug).await?;

        let path = self
            .reported_paths
            .read()
            .await
            .get(slug)
            .cloned()
            .unwrap_or_else(|| slug.to_string());

        let mut secrets = self.secrets.write().await;
        if secrets.contains_key(&path) {
            return Err(TransportError::from_status(409, format!("{path} already exists")));
        }
        secrets.insert(path.clone(), data.clone());
        Ok(SecretRecord::new(path, data.clone()))
    }

    async fn get_secret(
        &self,
        session: &ApiSession,
        slug: &str,
    ) -> Result<SecretRecord, TransportError> {
        self.record(SecretOp::Get, session, slug).await?;

        self.secrets
            .read()
            .await
            .get(slug)
            .map(|data| SecretRecord::new(slug, data.clone()))
            .ok_or_else(|| not_found(slug))
    }

    async fn update_secret(
        &self,
        session: &ApiSession,
        slug: &str,
        data: &SecretData,
    ) -> Result<SecretRecord, TransportError> {
        self.record(SecretOp::Update, session, slug).await?;

        let mut secrets = self.secrets.write().await;
        let entry = secrets.get_mut(slug).ok_or_else(|| not_found(slug))?;
        entry.clone_from(data);
        Ok(SecretRecord::new(slug, data.clone()))
    }

    async fn delete_secret(&self, session: &ApiSession, slug: &str) -> Result<(), TransportError> {
        self.record(SecretOp::Delete, session, slug).await?;

        self.secrets
            .write()
            .await
            .remove(slug)
            .map(|_| ())
            .ok_or_else(|| not_found(slug))
    }
}
