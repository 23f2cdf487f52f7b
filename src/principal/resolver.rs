use std::sync::Arc;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::credentials::{Credentials, CredentialsDescriptor};
use crate::error::ResolutionError;
use crate::observability::metrics::get_metrics;
use crate::principal::impersonation::email_from_impersonation_url;
use crate::principal::token_info::principal_email_from_token_info;
use crate::principal::PrincipalEmail;
use crate::sources::metadata::{EnvironmentProbe, MetadataClient, MetadataService};
use crate::utils::constants::TOKEN_INFO_URL;

/// Determines the principal email for a set of credentials.
///
/// Order, first match wins:
/// 1. metadata environment: the default service account's email
/// 2. credentials JSON: dispatch on its `type`
///    - `impersonated_service_account`: email embedded in the impersonation URL
///    - `authorized_user`: `email` claim from the token info endpoint
/// 3. otherwise the principal cannot be determined
///
/// Every branch's result goes through the principal email validator.
#[derive(Clone)]
pub struct PrincipalEmailResolver {
    probe: Arc<dyn EnvironmentProbe>,
    metadata: Arc<dyn MetadataService>,
    client: Client,
    token_info_url: String,
}

impl PrincipalEmailResolver {
    pub fn new(probe: Arc<dyn EnvironmentProbe>, metadata: Arc<dyn MetadataService>, client: Client) -> Self {
        Self { probe, metadata, client, token_info_url: TOKEN_INFO_URL.to_owned() }
    }

    /// Uses one metadata client both as the environment probe and the metadata service.
    pub fn from_metadata_client(metadata: MetadataClient, client: Client) -> Self {
        let metadata = Arc::new(metadata);
        Self::new(metadata.clone(), metadata, client)
    }

    pub fn with_token_info_url(mut self, token_info_url: impl Into<String>) -> Self {
        self.token_info_url = token_info_url.into();
        self
    }

    pub async fn resolve(&self, credentials: &Credentials) -> Result<PrincipalEmail, ResolutionError> {
        let metrics = get_metrics().await;
        let (branch, resolved) = self.resolve_unvalidated(credentials).await;

        let result = resolved.and_then(|email| {
            PrincipalEmail::parse(email).map_err(ResolutionError::InvalidPrincipalEmail)
        });
        match &result {
            Ok(email) => {
                info!(principal = %email, branch, "resolved principal email");
                metrics.principal_resolutions.with_label_values(&[branch]).inc();
            }
            Err(e) => {
                warn!(branch, "unable to resolve principal email: {}", e);
                metrics.principal_resolution_failures.with_label_values(&[failure_reason(e)]).inc();
            }
        }
        result
    }

    async fn resolve_unvalidated(&self, credentials: &Credentials) -> (&'static str, Result<String, ResolutionError>) {
        if self.probe.is_metadata_environment().await {
            debug!("metadata server detected, using default service account email");
            let email = self
                .metadata
                .default_service_account_email()
                .await
                .map_err(ResolutionError::MetadataFetch);
            return ("metadata", email);
        }

        let Some(json) = credentials.json() else {
            return ("none", Err(ResolutionError::PrincipalEmailUndeterminable));
        };

        let descriptor = match CredentialsDescriptor::from_json(json) {
            Ok(descriptor) => descriptor,
            Err(e) => return ("json", Err(ResolutionError::JsonDecode(e))),
        };
        debug!(?descriptor, "classified credentials JSON");

        match descriptor {
            CredentialsDescriptor::ImpersonatedServiceAccount { impersonation_url } => (
                "impersonated_service_account",
                email_from_impersonation_url(&impersonation_url).map_err(ResolutionError::from),
            ),
            CredentialsDescriptor::AuthorizedUser => {
                let email = principal_email_from_token_info(
                    credentials.token_provider.as_ref(),
                    &self.client,
                    &self.token_info_url,
                )
                .await
                .map_err(ResolutionError::TokenInfo);
                ("authorized_user", email)
            }
            CredentialsDescriptor::Untyped => ("json", Err(ResolutionError::NoTokenTypeDetected)),
            CredentialsDescriptor::Unsupported(kind) => ("json", Err(ResolutionError::UnsupportedTokenType(kind))),
        }
    }
}

fn failure_reason(e: &ResolutionError) -> &'static str {
    match e {
        ResolutionError::MetadataFetch(_) => "metadata_fetch",
        ResolutionError::InvalidPrincipalEmail(_) => "invalid_principal_email",
        ResolutionError::JsonDecode(_) => "json_decode",
        ResolutionError::UnsupportedTokenType(_) => "unsupported_token_type",
        ResolutionError::NoTokenTypeDetected => "no_token_type",
        ResolutionError::ImpersonationUrl(_) => "impersonation_url",
        ResolutionError::TokenInfo(_) => "token_info",
        ResolutionError::PrincipalEmailUndeterminable => "undeterminable",
    }
}
