//! `reqwest` implementation of the token and secrets services.

use crate::error::TransportError;
use crate::token::{TokenResponse, TokenService};
use crate::transport::{ApiSession, SecretData, SecretRecord, SecretService};
use async_trait::async_trait;
use dsv_common::{HttpConfig, build_http_client};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

const TOKEN_SEGMENT: &str = "token";
const SECRETS_SEGMENT: &str = "secrets";
const GRANT_TYPE: &str = "client_credentials";

/// Write body of the secrets endpoint.
#[derive(Serialize)]
struct SecretUpsert<'a> {
    data: &'a SecretData,
}

/// HTTP transport to the vault REST API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    /// Build a transport with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        Ok(Self {
            http: build_http_client(config)?,
        })
    }

    /// Use an existing HTTP client.
    #[must_use]
    pub const fn with_client(http: Client) -> Self {
        Self { http }
    }

    fn secret_url(session: &ApiSession, slug: &str) -> Result<Url, TransportError> {
        endpoint(session.api_root(), &[SECRETS_SEGMENT, slug])
    }

    fn authorized(
        &self,
        method: reqwest::Method,
        url: Url,
        session: &ApiSession,
    ) -> RequestBuilder {
        self.http.request(method, url).bearer_auth(session.bearer())
    }
}

/// Append `segments` to `api_root`, percent-encoding each one.
fn endpoint(api_root: &Url, segments: &[&str]) -> Result<Url, TransportError> {
    let mut url = api_root.clone();
    url.path_segments_mut()
        .map_err(|()| TransportError::InvalidEndpoint(api_root.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::from_status(status.as_u16(), body))
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, TransportError> {
    let response = check_status(request.send().await?).await?;
    Ok(response.json().await?)
}

#[async_trait]
impl TokenService for HttpTransport {
    #[instrument(skip_all, fields(client_id = %client_id))]
    async fn authenticate(
        &self,
        api_root: &Url,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<TokenResponse, TransportError> {
        let url = endpoint(api_root, &[TOKEN_SEGMENT])?;
        debug!(%url, "Requesting access token");

        let form = [
            ("grant_type", GRANT_TYPE),
            ("client_id", client_id),
            ("client_secret", client_secret.expose_secret()),
        ];
        send_json(self.http.post(url).form(&form)).await
    }
}

#[async_trait]
impl SecretService for HttpTransport {
    async fn create_secret(
        &self,
        session: &ApiSession,
        slug: &str,
        data: &SecretData,
    ) -> Result<SecretRecord, TransportError> {
        let url = Self::secret_url(session, slug)?;
        send_json(
            self.authorized(reqwest::Method::POST, url, session)
                .json(&SecretUpsert { data }),
        )
        .await
    }

    async fn get_secret(
        &self,
        session: &ApiSession,
        slug: &str,
    ) -> Result<SecretRecord, TransportError> {
        let url = Self::secret_url(session, slug)?;
        send_json(self.authorized(reqwest::Method::GET, url, session)).await
    }

    async fn update_secret(
        &self,
        session: &ApiSession,
        slug: &str,
        data: &SecretData,
    ) -> Result<SecretRecord, TransportError> {
        let url = Self::secret_url(session, slug)?;
        send_json(
            self.authorized(reqwest::Method::PUT, url, session)
                .json(&SecretUpsert { data }),
        )
        .await
    }

    async fn delete_secret(&self, session: &ApiSession, slug: &str) -> Result<(), TransportError> {
        let url = Self::secret_url(session, slug)?;
        let response = self
            .authorized(reqwest::Method::DELETE, url, session)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let root = Url::parse("https://tenant.example.com/v1").unwrap();
        assert_eq!(
            endpoint(&root, &["token"]).unwrap().as_str(),
            "https://tenant.example.com/v1/token"
        );
        assert_eq!(
            endpoint(&root, &["secrets", "uipath:folder:asset"]).unwrap().as_str(),
            "https://tenant.example.com/v1/secrets/uipath:folder:asset"
        );
    }

    #[test]
    fn test_endpoint_encodes_slug_as_one_segment() {
        let root = Url::parse("https://tenant.example.com/v1").unwrap();
        assert_eq!(
            endpoint(&root, &["secrets", "uipath:my key?#"]).unwrap().as_str(),
            "https://tenant.example.com/v1/secrets/uipath:my%20key%3F%23"
        );
    }

    #[test]
    fn test_endpoint_trailing_slash_root() {
        let root = Url::parse("https://tenant.example.com/v1/").unwrap();
        assert_eq!(
            endpoint(&root, &["token"]).unwrap().as_str(),
            "https://tenant.example.com/v1/token"
        );
    }

    #[test]
    fn test_endpoint_rejects_opaque_url() {
        let root = Url::parse("mailto:vault@example.com").unwrap();
        assert!(matches!(
            endpoint(&root, &["token"]),
            Err(TransportError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_new_transport() {
        assert!(HttpTransport::new(&HttpConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_with_client_sends_bearer() {
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/secrets/uipath:a"))
            .and(header("authorization", "Bearer shared-client-token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::with_client(Client::new());
        let session = ApiSession::new(
            Url::parse(&format!("{}/v1", server.uri())).unwrap(),
            std::sync::Arc::new(crate::token::CachedToken::expiring_in(
                "shared-client-token",
                3600,
            )),
        );

        transport.delete_secret(&session, "uipath:a").await.unwrap();
    }
}
