//! Secret records and the transport interface to the vault's secrets API.

use crate::error::TransportError;
use crate::token::CachedToken;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// Data key holding the secret value.
pub const PASSWORD_KEY: &str = "password";
/// Data key holding the user name of a credential pair.
pub const USERNAME_KEY: &str = "username";

/// Secret payload as stored by the vault.
pub type SecretData = HashMap<String, serde_json::Value>;

/// A secret as returned by the vault.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretRecord {
    /// Slug the vault stored the secret under
    pub path: String,
    /// Secret payload
    #[serde(default)]
    pub data: SecretData,
}

impl SecretRecord {
    /// Create a record.
    #[must_use]
    pub fn new(path: impl Into<String>, data: SecretData) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// String form of a data field. Non-string JSON values are rendered as JSON.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<String> {
        self.data.get(key).map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// User name and password pair.
#[derive(Debug)]
pub struct Credential {
    /// User name
    pub username: String,
    /// Password, redacted in `Debug` output
    pub password: SecretString,
}

impl Credential {
    /// Create a credential.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// What gets written to a secret.
#[derive(Debug)]
pub enum SecretPayload {
    /// A single opaque value, stored under `password`
    Value(SecretString),
    /// A user name and password pair
    Credential(Credential),
}

impl SecretPayload {
    /// Create a single-value payload.
    #[must_use]
    pub fn value(value: impl Into<String>) -> Self {
        Self::Value(SecretString::from(value.into()))
    }

    /// Render the payload as vault data.
    #[must_use]
    pub fn to_data(&self) -> SecretData {
        let mut data = SecretData::new();
        match self {
            Self::Value(value) => {
                data.insert(PASSWORD_KEY.to_string(), value.expose_secret().into());
            }
            Self::Credential(credential) => {
                data.insert(USERNAME_KEY.to_string(), credential.username.clone().into());
                data.insert(
                    PASSWORD_KEY.to_string(),
                    credential.password.expose_secret().into(),
                );
            }
        }
        data
    }
}

impl From<Credential> for SecretPayload {
    fn from(credential: Credential) -> Self {
        Self::Credential(credential)
    }
}

/// Authenticated view of the vault API used for one operation.
#[derive(Debug, Clone)]
pub struct ApiSession {
    api_root: Url,
    token: Arc<CachedToken>,
}

impl ApiSession {
    /// Create a session.
    #[must_use]
    pub const fn new(api_root: Url, token: Arc<CachedToken>) -> Self {
        Self { api_root, token }
    }

    /// API root, e.g. `https://tenant.secretsvaultcloud.com/v1`.
    #[must_use]
    pub const fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// Bearer token to attach to requests.
    #[must_use]
    pub fn bearer(&self) -> &str {
        self.token.access_token().expose_secret()
    }
}

/// REST operations against the vault's secrets endpoint.
///
/// Slugs are already normalized by the caller.
#[async_trait]
pub trait SecretService: Send + Sync {
    /// Create a secret at `slug`.
    async fn create_secret(
        &self,
        session: &ApiSession,
        slug: &str,
        data: &SecretData,
    ) -> Result<SecretRecord, TransportError>;

    /// Read the secret at `slug`.
    async fn get_secret(&self, session: &ApiSession, slug: &str)
    -> Result<SecretRecord, TransportError>;

    /// Replace the data of the secret at `slug`.
    async fn update_secret(
        &self,
        session: &ApiSession,
        slug: &str,
        data: &SecretData,
    ) -> Result<SecretRecord, TransportError>;

    /// Delete the secret at `slug`.
    async fn delete_secret(&self, session: &ApiSession, slug: &str) -> Result<(), TransportError>;
}
