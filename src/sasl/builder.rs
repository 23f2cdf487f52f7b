use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use tracing::info;

use crate::config::AuthConfig;
use crate::credentials::DefaultCredentialDiscovery;
use crate::error::MechanismError;
use crate::helpers::time::get_token_safety_margin_seconds;
use crate::principal::PrincipalEmailResolver;
use crate::sasl::GcpPlainMechanism;
use crate::sources::build_token_provider;
use crate::sources::metadata::MetadataClient;
use crate::utils::constants::CLOUD_PLATFORM_SCOPE;

/// Build the mechanism described by the `auth` config block.
///
/// With both `principal_email` and `token_source` set the principal is taken
/// as given. Otherwise the ambient credentials are discovered and their
/// principal email resolved.
pub async fn build_mechanism(auth: &AuthConfig, client: &Client) -> Result<GcpPlainMechanism, MechanismError> {
    let scope = auth.scope.as_deref().unwrap_or(CLOUD_PLATFORM_SCOPE);
    let safety_margin_seconds = get_token_safety_margin_seconds(auth.safety_margin_seconds);

    let mut metadata = MetadataClient::new(client.clone(), auth.metadata_host.as_ref().map(|host| format!("http://{host}")));
    if let Some(ms) = auth.metadata_probe_timeout_ms {
        metadata = metadata.with_probe_timeout(Duration::from_millis(ms));
    }

    if let (Some(principal_email), Some(token_source)) = (&auth.principal_email, &auth.token_source) {
        info!("using configured principal email and token source");
        let token_provider = build_token_provider(token_source, &metadata, scope, safety_margin_seconds);
        return GcpPlainMechanism::with_token_provider(token_provider, principal_email).await;
    }

    let discovery = DefaultCredentialDiscovery::new(metadata.clone(), safety_margin_seconds)
        .with_token_source(auth.token_source.clone())
        .with_credentials_file(auth.credentials_file.as_ref().map(PathBuf::from));

    let mut resolver = PrincipalEmailResolver::from_metadata_client(metadata, client.clone());
    if let Some(url) = &auth.token_info_url {
        resolver = resolver.with_token_info_url(url.as_str());
    }

    match &auth.scope {
        Some(scope) => GcpPlainMechanism::from_default_credentials_with_scope(&discovery, &resolver, scope).await,
        None => GcpPlainMechanism::from_default_credentials(&discovery, &resolver).await,
    }
}
