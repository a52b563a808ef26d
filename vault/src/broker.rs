//! Authenticated secret operations.
//!
//! [`SecretBroker`] resolves the API root and a bearer token for a context,
//! producing a [`BrokerSession`] that runs the create/get/update/delete
//! protocol and translates every transport error into a [`StoreError`].

use crate::context::VaultContext;
use crate::error::{StoreError, StoreResult};
use crate::path;
use crate::token::{TokenCache, TokenService};
use crate::transport::{ApiSession, SecretPayload, SecretRecord, SecretService};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Composes the token cache with both transport services.
pub struct SecretBroker {
    tokens: Arc<TokenCache>,
    token_service: Arc<dyn TokenService>,
    secret_service: Arc<dyn SecretService>,
}

impl SecretBroker {
    /// Create a broker. The cache may be shared with other brokers.
    #[must_use]
    pub fn new(
        tokens: Arc<TokenCache>,
        token_service: Arc<dyn TokenService>,
        secret_service: Arc<dyn SecretService>,
    ) -> Self {
        Self {
            tokens,
            token_service,
            secret_service,
        }
    }

    /// Token cache used by this broker.
    #[must_use]
    pub const fn token_cache(&self) -> &Arc<TokenCache> {
        &self.tokens
    }

    /// Resolve the API root and a valid token for `context`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfiguration`] if the URL cannot be
    /// resolved or authentication fails, or the mapped transport error.
    #[instrument(skip_all, fields(client_id = %context.client_id()))]
    pub async fn connect<'a>(
        &'a self,
        context: &'a VaultContext,
    ) -> StoreResult<BrokerSession<'a>> {
        let api_root = context.api_root()?;
        let token = self
            .tokens
            .get_token(
                &api_root,
                context.client_id(),
                context.client_secret(),
                self.token_service.as_ref(),
            )
            .await?;

        Ok(BrokerSession {
            secrets: self.secret_service.as_ref(),
            context,
            session: ApiSession::new(api_root, token),
        })
    }
}

/// Secret operations bound to one context and token.
pub struct BrokerSession<'a> {
    secrets: &'a dyn SecretService,
    context: &'a VaultContext,
    session: ApiSession,
}

impl BrokerSession<'_> {
    /// Slug for a new secret at `path` under the context's base prefix.
    #[must_use]
    pub fn qualified_slug(&self, path: &str) -> String {
        path::qualify(self.context.base_path_prefix(), path)
    }

    /// Create a secret under the base prefix and return the path the vault
    /// reports for it.
    ///
    /// # Errors
    ///
    /// Returns the mapped transport error.
    #[instrument(skip(self, payload))]
    pub async fn create(&self, path: &str, payload: &SecretPayload) -> StoreResult<String> {
        let slug = self.qualified_slug(path);
        debug!(%slug, "Creating secret");
        let record = self
            .secrets
            .create_secret(&self.session, &slug, &payload.to_data())
            .await
            .map_err(StoreError::from_transport)?;
        Ok(record.path)
    }

    /// Read the secret at a fully qualified `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SecretNotFound`] for unknown paths, or the
    /// mapped transport error.
    #[instrument(skip(self))]
    pub async fn get(&self, path: &str) -> StoreResult<SecretRecord> {
        let slug = path::normalize(path);
        self.secrets
            .get_secret(&self.session, &slug)
            .await
            .map_err(StoreError::from_transport)
    }

    /// Delete the secret at a fully qualified `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SecretNotFound`] for unknown paths, or the
    /// mapped transport error.
    #[instrument(skip(self))]
    pub async fn delete(&self, path: &str) -> StoreResult<()> {
        let slug = path::normalize(path);
        self.secrets
            .delete_secret(&self.session, &slug)
            .await
            .map_err(StoreError::from_transport)
    }

    /// Write `payload` for the logical key `new_path`, whose secret currently
    /// lives at `old_path`.
    ///
    /// When the key still maps to `old_path` the secret is updated in place.
    /// Otherwise the secret is created at the new slug and the old one is
    /// removed on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns the mapped transport error of the update or create call.
    #[instrument(skip(self, payload))]
    pub async fn update(
        &self,
        new_path: &str,
        old_path: &str,
        payload: &SecretPayload,
    ) -> StoreResult<String> {
        let slug = self.qualified_slug(new_path);
        let data = payload.to_data();

        if slug == old_path.to_lowercase() {
            debug!(%slug, "Updating secret in place");
            let record = self
                .secrets
                .update_secret(&self.session, &slug, &data)
                .await
                .map_err(StoreError::from_transport)?;
            return Ok(record.path);
        }

        debug!(%slug, old_path, "Moving secret to a new path");
        let record = self
            .secrets
            .create_secret(&self.session, &slug, &data)
            .await
            .map_err(StoreError::from_transport)?;

        // The new secret is authoritative from here on. Removing the old one
        // is attempted once and its outcome discarded.
        self.discard_superseded(old_path).await;

        Ok(record.path)
    }

    async fn discard_superseded(&self, old_path: &str) {
        let old_slug = path::normalize(old_path);
        match self.secrets.delete_secret(&self.session, &old_slug).await {
            Ok(()) => debug!(slug = %old_slug, "Removed superseded secret"),
            Err(error) => warn!(
                slug = %old_slug,
                %error,
                "Could not remove superseded secret, leaving it in place"
            ),
        }
    }
}
