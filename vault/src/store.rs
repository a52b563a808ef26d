//! Secure store surface consumed by the host.
//!
//! Every call receives the serialized [`VaultContext`] and deserializes it
//! afresh; the token cache is the only state kept between calls. Arguments
//! the host may omit are `Option`s and are checked before any network call.

use crate::broker::SecretBroker;
use crate::config::StoreConfig;
use crate::context::VaultContext;
use crate::error::{StoreError, StoreResult};
use crate::http::HttpTransport;
use crate::token::TokenCache;
use crate::transport::{Credential, PASSWORD_KEY, SecretPayload, SecretRecord, USERNAME_KEY};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Path segment under which connectivity probes are written.
pub const VALIDATION_PREFIX: &str = "validate";

/// Secure store backed by DevOps Secrets Vault.
pub struct SecureStore {
    broker: SecretBroker,
}

impl SecureStore {
    /// Create a store on top of `broker`.
    #[must_use]
    pub const fn new(broker: SecretBroker) -> Self {
        Self { broker }
    }

    /// Create a store talking HTTP to the vault, sharing `tokens`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Generic`] if the HTTP client cannot be built.
    pub fn from_config(config: &StoreConfig, tokens: Arc<TokenCache>) -> StoreResult<Self> {
        let transport = Arc::new(
            HttpTransport::new(&config.http_config())
                .map_err(|e| StoreError::generic("Failed to build HTTP client", Some(e.into())))?,
        );
        Ok(Self::new(SecretBroker::new(tokens, transport.clone(), transport)))
    }

    /// Underlying broker.
    #[must_use]
    pub const fn broker(&self) -> &SecretBroker {
        &self.broker
    }

    /// Prove connectivity and credentials by writing and deleting a
    /// throwaway secret.
    ///
    /// # Errors
    ///
    /// Returns the classified error of the first step that fails.
    #[instrument(skip_all)]
    pub async fn validate_context(&self, context: &str) -> StoreResult<()> {
        let id = Uuid::new_v4().to_string();
        let ctx = VaultContext::from_json(context)?;
        let session = self.broker.connect(&ctx).await?;

        let path = session
            .create(&format!("{VALIDATION_PREFIX}:{id}"), &SecretPayload::value(id.as_str()))
            .await?;
        session.delete(&path).await?;

        info!(client_id = %ctx.client_id(), "Vault context validated");
        Ok(())
    }

    /// Store a single value under `key` and return its vault path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidArgument`] when `key` or `value` is
    /// missing, otherwise the classified vault error.
    #[instrument(skip(self, context, value))]
    pub async fn create_value(
        &self,
        context: &str,
        key: Option<&str>,
        value: Option<&str>,
    ) -> StoreResult<String> {
        let ctx = VaultContext::from_json(context)?;
        let key = required(key, "key")?;
        let value = required(value, "value")?;

        let session = self.broker.connect(&ctx).await?;
        session.create(key, &SecretPayload::value(value)).await
    }

    /// Read the value stored at the vault path `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SecretNotFound`] if the path or its value is
    /// missing, otherwise the classified vault error.
    #[instrument(skip(self, context))]
    pub async fn get_value(&self, context: &str, key: Option<&str>) -> StoreResult<String> {
        let record = self.fetch(context, key).await?;
        project(&record, PASSWORD_KEY)
    }

    /// Store a credential pair under `key` and return its vault path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidArgument`] when `key` or `value` is
    /// missing, otherwise the classified vault error.
    #[instrument(skip(self, context, value))]
    pub async fn create_credentials(
        &self,
        context: &str,
        key: Option<&str>,
        value: Option<Credential>,
    ) -> StoreResult<String> {
        let ctx = VaultContext::from_json(context)?;
        let key = required(key, "key")?;
        let value = required(value, "value")?;

        let session = self.broker.connect(&ctx).await?;
        session.create(key, &SecretPayload::from(value)).await
    }

    /// Read the credential pair stored at the vault path `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SecretNotFound`] if the path, user name or
    /// password is missing, otherwise the classified vault error.
    #[instrument(skip(self, context))]
    pub async fn get_credentials(
        &self,
        context: &str,
        key: Option<&str>,
    ) -> StoreResult<Credential> {
        let record = self.fetch(context, key).await?;
        Ok(Credential::new(
            project(&record, USERNAME_KEY)?,
            project(&record, PASSWORD_KEY)?,
        ))
    }

    /// Write a new value for `key`, whose secret currently lives at
    /// `old_path`. Returns the path the value now lives at.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidArgument`] when `key` or `value` is
    /// missing, otherwise the classified vault error.
    #[instrument(skip(self, context, value))]
    pub async fn update_value(
        &self,
        context: &str,
        key: Option<&str>,
        old_path: &str,
        value: Option<&str>,
    ) -> StoreResult<String> {
        let ctx = VaultContext::from_json(context)?;
        let key = required(key, "key")?;
        let value = required(value, "value")?;

        let session = self.broker.connect(&ctx).await?;
        session
            .update(key, old_path, &SecretPayload::value(value))
            .await
    }

    /// Write a new credential pair for `key`, whose secret currently lives
    /// at `old_path`. Returns the path the credential now lives at.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidArgument`] when `key` or `value` is
    /// missing, otherwise the classified vault error.
    #[instrument(skip(self, context, value))]
    pub async fn update_credentials(
        &self,
        context: &str,
        key: Option<&str>,
        old_path: &str,
        value: Option<Credential>,
    ) -> StoreResult<String> {
        let ctx = VaultContext::from_json(context)?;
        let key = required(key, "key")?;
        let value = required(value, "value")?;

        let session = self.broker.connect(&ctx).await?;
        session
            .update(key, old_path, &SecretPayload::from(value))
            .await
    }

    /// Delete the secret at the vault path `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SecretNotFound`] for unknown paths, otherwise
    /// the classified vault error.
    #[instrument(skip(self, context))]
    pub async fn remove_value(&self, context: &str, key: Option<&str>) -> StoreResult<()> {
        let ctx = VaultContext::from_json(context)?;
        let key = required(key, "key")?;

        let session = self.broker.connect(&ctx).await?;
        session.delete(key).await
    }

    async fn fetch(&self, context: &str, key: Option<&str>) -> StoreResult<SecretRecord> {
        let ctx = VaultContext::from_json(context)?;
        let key = required(key, "key")?;

        let session = self.broker.connect(&ctx).await?;
        session.get(key).await
    }
}

fn required<T>(arg: Option<T>, name: &'static str) -> StoreResult<T> {
    arg.ok_or(StoreError::InvalidArgument(name))
}

fn project(record: &SecretRecord, field: &str) -> StoreResult<String> {
    record
        .field(field)
        .ok_or_else(|| StoreError::missing_field(&record.path, field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_required() {
        assert_eq!(required(Some("k"), "key").unwrap(), "k");
        let err = required::<&str>(None, "value").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.to_string(), "Missing required argument: value");
    }

    #[test]
    fn test_context_checked_before_arguments() {
        let store =
            SecureStore::from_config(&StoreConfig::default(), Arc::new(TokenCache::new())).unwrap();

        let err = tokio_test::block_on(store.get_value("{}", None)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);

        let err = tokio_test::block_on(store.create_value("{}", Some("k"), None)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    }

    #[test]
    fn test_project() {
        let mut data = crate::transport::SecretData::new();
        data.insert(PASSWORD_KEY.to_string(), json!("v"));
        let record = SecretRecord::new("uipath:a", data);

        assert_eq!(project(&record, PASSWORD_KEY).unwrap(), "v");
        let err = project(&record, USERNAME_KEY).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SecretNotFound);
    }
}
