use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::cache::token::AccessToken;
use crate::error::{MetadataError, TokenError};
use crate::sources::TokenProvider;
use crate::utils::constants::{
    DEFAULT_PROBE_TIMEOUT_MS, METADATA_DEFAULT_SA_PATH, METADATA_FLAVOR, METADATA_FLAVOR_VALUE,
    METADATA_HOST_ENV, METADATA_ROOT,
};

/// Answers "are we running next to a Compute metadata server?".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnvironmentProbe: Send + Sync {
    async fn is_metadata_environment(&self) -> bool;
}

/// The part of the metadata server the resolver needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataService: Send + Sync {
    async fn default_service_account_email(&self) -> Result<String, MetadataError>;
}

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// Client for the Compute Engine metadata server.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    endpoint: String,
    client: Client,
    probe_timeout: Duration,
    on_metadata: std::sync::Arc<OnceCell<bool>>,
    host_from_env: bool,
}

impl MetadataClient {
    /// `GCE_METADATA_HOST` wins over `endpoint_override`, which wins over the
    /// default metadata root.
    pub fn new(client: Client, endpoint_override: Option<String>) -> Self {
        let (endpoint, host_from_env) = match std::env::var(METADATA_HOST_ENV) {
            Ok(host) if !host.is_empty() => (format!("http://{host}"), true),
            _ => (endpoint_override.unwrap_or_else(|| METADATA_ROOT.to_owned()), false),
        };
        Self {
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            client,
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            on_metadata: Default::default(),
            host_from_env,
        }
    }

    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The caller's HTTP client, shared with the other remote token sources.
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Token provider for the default service account, scoped to `scope`.
    pub fn token_provider(&self, scope: &str) -> MetadataTokenProvider {
        MetadataTokenProvider { metadata: self.clone(), scope: scope.to_owned() }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.endpoint, path))
            .header(METADATA_FLAVOR, METADATA_FLAVOR_VALUE)
    }

    async fn probe(&self) -> bool {
        if self.host_from_env {
            return true;
        }
        let response = self.get("/").timeout(self.probe_timeout).send().await;
        match response {
            Ok(response) => response
                .headers()
                .get(METADATA_FLAVOR)
                .map(|v| v == METADATA_FLAVOR_VALUE)
                .unwrap_or(false),
            Err(e) => {
                debug!("metadata server probe failed: {}", e);
                false
            }
        }
    }

    async fn check_status(response: Response) -> Result<Response, (reqwest::StatusCode, String)> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err((status, body))
    }
}

#[async_trait]
impl EnvironmentProbe for MetadataClient {
    async fn is_metadata_environment(&self) -> bool {
        *self.on_metadata.get_or_init(|| self.probe()).await
    }
}

#[async_trait]
impl MetadataService for MetadataClient {
    async fn default_service_account_email(&self) -> Result<String, MetadataError> {
        let response = self.get(&format!("{METADATA_DEFAULT_SA_PATH}/email")).send().await?;
        let response = Self::check_status(response)
            .await
            .map_err(|(status, body)| MetadataError::Status { status, body })?;
        let email = response.text().await?.trim().to_owned();
        if email.is_empty() {
            return Err(MetadataError::Empty);
        }
        Ok(email)
    }
}

/// Access tokens of the default service account, from the metadata server.
#[derive(Debug, Clone)]
pub struct MetadataTokenProvider {
    metadata: MetadataClient,
    scope: String,
}

#[async_trait]
impl TokenProvider for MetadataTokenProvider {
    async fn token(&self) -> Result<AccessToken, TokenError> {
        let response = self
            .metadata
            .get(&format!("{METADATA_DEFAULT_SA_PATH}/token"))
            .query(&[("scopes", self.scope.as_str())])
            .send()
            .await?;
        let response = MetadataClient::check_status(response)
            .await
            .map_err(|(status, body)| TokenError::Status { status, body })?;
        let body = response.text().await?;
        let parsed: MetadataTokenResponse = serde_json::from_str(&body)?;
        if parsed.access_token.is_empty() {
            return Err(TokenError::Empty);
        }
        Ok(AccessToken::expiring_in(parsed.access_token, parsed.expires_in))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use serde_json::json;
    use serial_test::serial;

    fn client_for(server: &MockServer) -> MetadataClient {
        MetadataClient::new(Client::new(), Some(server.base_url()))
    }

    #[tokio::test]
    #[serial]
    async fn test_default_service_account_email() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(GET)
                .path("/computeMetadata/v1/instance/service-accounts/default/email")
                .header("metadata-flavor", "Google");
            then.status(200).body("sa@my-project.iam.gserviceaccount.com\n");
        }).await;

        let email = client_for(&server).default_service_account_email().await.unwrap();
        assert_eq!(email, "sa@my-project.iam.gserviceaccount.com");
        mock.assert_async().await;
    }

    #[tokio::test]
    #[serial]
    async fn test_default_service_account_email_error_status() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/computeMetadata/v1/instance/service-accounts/default/email");
            then.status(404).body("not found");
        }).await;

        let err = client_for(&server).default_service_account_email().await.unwrap_err();
        assert!(matches!(err, MetadataError::Status { status, .. } if status == 404));
    }

    #[tokio::test]
    #[serial]
    async fn test_token_requests_scope() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(GET)
                .path("/computeMetadata/v1/instance/service-accounts/default/token")
                .query_param("scopes", "https://www.googleapis.com/auth/cloud-platform")
                .header("metadata-flavor", "Google");
            then.status(200).json_body(json!({
                "access_token": "meta-abc-123",
                "expires_in": 3599,
                "token_type": "Bearer"
            }));
        }).await;

        let token = client_for(&server)
            .token_provider("https://www.googleapis.com/auth/cloud-platform")
            .token()
            .await
            .unwrap();
        assert_eq!(token.value, "meta-abc-123");
        assert!(token.exp_unix_ts.is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    #[serial]
    async fn test_probe_checks_flavor_header_once() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(GET).path("/");
            then.status(200).header("Metadata-Flavor", "Google");
        }).await;

        let metadata = client_for(&server);
        assert!(metadata.is_metadata_environment().await);
        assert!(metadata.is_metadata_environment().await);
        mock.assert_async().await;
    }

    #[tokio::test]
    #[serial]
    async fn test_probe_rejects_foreign_server() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/");
            then.status(200).body("hello");
        }).await;

        assert!(!client_for(&server).is_metadata_environment().await);
    }

    #[tokio::test]
    #[serial]
    async fn test_probe_trusts_metadata_host_env() {
        std::env::set_var(METADATA_HOST_ENV, "127.0.0.1:1");
        let metadata = MetadataClient::new(Client::new(), None);
        std::env::remove_var(METADATA_HOST_ENV);

        assert_eq!(metadata.endpoint(), "http://127.0.0.1:1");
        assert!(metadata.is_metadata_environment().await);
    }
}
