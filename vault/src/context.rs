//! Connection context handed over by the host on every call.

use crate::error::{StoreError, StoreResult};
use secrecy::SecretString;
use serde::Deserialize;
use std::str::FromStr;
use url::Url;

/// Prefix used when the context does not name one.
pub const DEFAULT_BASE_PATH_PREFIX: &str = "uipath";

/// Version segment of the vault API root.
pub const API_VERSION: &str = "v1";

/// Wire shape of the context string. Field names follow the host settings.
#[derive(Deserialize)]
struct RawContext {
    #[serde(rename = "DevOpsVaultUrl", alias = "devOpsVaultUrl", alias = "vaultUrl")]
    vault_url: Option<String>,
    #[serde(rename = "ClientId", alias = "clientId")]
    client_id: Option<String>,
    #[serde(rename = "ClientSecret", alias = "clientSecret")]
    client_secret: Option<String>,
    #[serde(rename = "BasePathPrefix", alias = "basePathPrefix")]
    base_path_prefix: Option<String>,
}

/// Vault connection context.
///
/// Immutable once built. The client secret is redacted in `Debug` output.
#[derive(Debug)]
pub struct VaultContext {
    vault_url: Url,
    client_id: String,
    client_secret: SecretString,
    base_path_prefix: String,
}

impl VaultContext {
    /// Create a context with the default base path prefix.
    #[must_use]
    pub fn new(
        vault_url: Url,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            vault_url,
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
            base_path_prefix: DEFAULT_BASE_PATH_PREFIX.to_string(),
        }
    }

    /// Set the base path prefix.
    #[must_use]
    pub fn with_base_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.base_path_prefix = prefix.into();
        self
    }

    /// Deserialize a context from the host's JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfiguration`] if the JSON is malformed,
    /// a mandatory setting is missing or empty, or the URL does not parse.
    pub fn from_json(context: &str) -> StoreResult<Self> {
        let raw: RawContext = serde_json::from_str(context).map_err(StoreError::invalid_context)?;

        let vault_url = required(raw.vault_url, "DevOpsVaultUrl")?;
        let vault_url = Url::parse(&vault_url).map_err(StoreError::invalid_context)?;
        let client_id = required(raw.client_id, "ClientId")?;
        let client_secret = required(raw.client_secret, "ClientSecret")?;

        let context = Self::new(vault_url, client_id, client_secret);
        Ok(match raw.base_path_prefix {
            Some(prefix) if !prefix.trim().is_empty() => context.with_base_path_prefix(prefix),
            _ => context,
        })
    }

    /// Vault URL as configured.
    #[must_use]
    pub const fn vault_url(&self) -> &Url {
        &self.vault_url
    }

    /// OAuth2 client id. Also the token cache key.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// OAuth2 client secret.
    #[must_use]
    pub const fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }

    /// Namespace prepended to newly created secret paths.
    #[must_use]
    pub fn base_path_prefix(&self) -> &str {
        &self.base_path_prefix
    }

    /// Resolve the API root: trailing slashes stripped, version segment
    /// appended unless the URL already ends with it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfiguration`] if the resulting URL does
    /// not parse.
    pub fn api_root(&self) -> StoreResult<Url> {
        let mut root = self.vault_url.as_str().trim_end_matches('/').to_string();
        if !root.ends_with(API_VERSION) {
            root.push('/');
            root.push_str(API_VERSION);
        }
        Url::parse(&root).map_err(StoreError::invalid_context)
    }
}

impl FromStr for VaultContext {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json(s)
    }
}

fn required(value: Option<String>, name: &str) -> StoreResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(StoreError::invalid_context(format!(
            "missing required setting {name}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use secrecy::ExposeSecret;

    fn context(url: &str) -> VaultContext {
        VaultContext::new(Url::parse(url).unwrap(), "client", "secret")
    }

    #[test]
    fn test_from_json_host_names() {
        let ctx = VaultContext::from_json(
            r#"{"DevOpsVaultUrl":"https://tenant.secretsvaultcloud.com","ClientId":"id","ClientSecret":"s3cret","BasePathPrefix":"orchestrator"}"#,
        )
        .unwrap();

        assert_eq!(ctx.client_id(), "id");
        assert_eq!(ctx.client_secret().expose_secret(), "s3cret");
        assert_eq!(ctx.base_path_prefix(), "orchestrator");
        assert_eq!(ctx.vault_url().host_str(), Some("tenant.secretsvaultcloud.com"));
    }

    #[test]
    fn test_from_json_camel_case_and_default_prefix() {
        let ctx: VaultContext = r#"{"devOpsVaultUrl":"https://v.example.com","clientId":"id","clientSecret":"s"}"#
            .parse()
            .unwrap();
        assert_eq!(ctx.base_path_prefix(), DEFAULT_BASE_PATH_PREFIX);

        let ctx = VaultContext::from_json(
            r#"{"DevOpsVaultUrl":"https://v.example.com","ClientId":"id","ClientSecret":"s","BasePathPrefix":""}"#,
        )
        .unwrap();
        assert_eq!(ctx.base_path_prefix(), DEFAULT_BASE_PATH_PREFIX);
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        for input in [
            "not json",
            r#"{"ClientId":"id","ClientSecret":"s"}"#,
            r#"{"DevOpsVaultUrl":"https://v.example.com","ClientId":"","ClientSecret":"s"}"#,
            r#"{"DevOpsVaultUrl":"https://v.example.com","ClientId":"id"}"#,
            r#"{"DevOpsVaultUrl":"not a url","ClientId":"id","ClientSecret":"s"}"#,
        ] {
            let err = VaultContext::from_json(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidConfiguration, "{input}");
        }
    }

    #[test]
    fn test_api_root() {
        assert_eq!(
            context("https://tenant.example.com").api_root().unwrap().as_str(),
            "https://tenant.example.com/v1"
        );
        assert_eq!(
            context("https://tenant.example.com/").api_root().unwrap().as_str(),
            "https://tenant.example.com/v1"
        );
        assert_eq!(
            context("https://tenant.example.com/v1/").api_root().unwrap().as_str(),
            "https://tenant.example.com/v1"
        );
        assert_eq!(
            context("https://tenant.example.com/vault//").api_root().unwrap().as_str(),
            "https://tenant.example.com/vault/v1"
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", context("https://tenant.example.com"));
        assert!(!debug.contains("\"secret\""));
        assert!(debug.contains("client"));
    }
}
