//! SASL/PLAIN with a Google access token as the password.
//!
//! The initial response is `\0<principal email>\0<access token>`: empty
//! authorization identity, principal email as authentication identity.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::credentials::CredentialDiscovery;
use crate::error::MechanismError;
use crate::observability::metrics::get_metrics;
use crate::principal::{PrincipalEmail, PrincipalEmailResolver};
use crate::sasl::{Mechanism, StateMachine};
use crate::sources::TokenProvider;
use crate::utils::constants::{CLOUD_PLATFORM_SCOPE, PLAIN_MECHANISM};

/// Build the PLAIN initial response.
pub fn plain_payload(principal_email: &str, access_token: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(principal_email.len() + access_token.len() + 2);
    payload.push(0);
    payload.extend_from_slice(principal_email.as_bytes());
    payload.push(0);
    payload.extend_from_slice(access_token.as_bytes());
    payload
}

/// PLAIN mechanism pairing a resolved principal email with a token provider.
///
/// Resolution happens once at construction; every handshake fetches a fresh
/// token from the provider.
#[derive(Clone)]
pub struct GcpPlainMechanism {
    principal_email: PrincipalEmail,
    token_provider: Arc<dyn TokenProvider>,
}

impl GcpPlainMechanism {
    /// Discover ambient credentials scoped to cloud-platform and resolve
    /// their principal email.
    pub async fn from_default_credentials(
        discovery: &dyn CredentialDiscovery,
        resolver: &PrincipalEmailResolver,
    ) -> Result<Self, MechanismError> {
        Self::from_default_credentials_with_scope(discovery, resolver, CLOUD_PLATFORM_SCOPE).await
    }

    pub async fn from_default_credentials_with_scope(
        discovery: &dyn CredentialDiscovery,
        resolver: &PrincipalEmailResolver,
        scope: &str,
    ) -> Result<Self, MechanismError> {
        let credentials = discovery
            .find_default_credentials(scope)
            .await
            .map_err(MechanismError::CredentialDiscovery)?;
        let principal_email = resolver
            .resolve(&credentials)
            .await
            .map_err(MechanismError::Resolution)?;
        Ok(Self::from_parts(principal_email, credentials.token_provider))
    }

    /// Use a caller-supplied token provider and principal email. The email is
    /// validated first, then one token is fetched to prove the provider works.
    pub async fn with_token_provider(
        token_provider: Arc<dyn TokenProvider>,
        principal_email: &str,
    ) -> Result<Self, MechanismError> {
        let principal_email =
            PrincipalEmail::parse(principal_email).map_err(MechanismError::InvalidPrincipalEmail)?;
        token_provider
            .token()
            .await
            .map_err(MechanismError::TokenSourceInvalid)?;
        Ok(Self::from_parts(principal_email, token_provider))
    }

    pub fn from_parts(principal_email: PrincipalEmail, token_provider: Arc<dyn TokenProvider>) -> Self {
        Self { principal_email, token_provider }
    }

    pub fn principal_email(&self) -> &PrincipalEmail {
        &self.principal_email
    }
}

impl fmt::Debug for GcpPlainMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcpPlainMechanism")
            .field("principal_email", &self.principal_email)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Mechanism for GcpPlainMechanism {
    fn name(&self) -> &'static str {
        PLAIN_MECHANISM
    }

    async fn start(&self) -> Result<(Box<dyn StateMachine>, Vec<u8>), MechanismError> {
        let metrics = get_metrics().await;
        metrics.handshake_starts.inc();
        metrics.token_fetches.inc();

        let token = self.token_provider.token().await.map_err(|e| {
            error!("unable to fetch access token for handshake: {}", e);
            metrics.token_fetch_failures.inc();
            MechanismError::TokenFetch(e)
        })?;

        debug!(principal = %self.principal_email, "sending PLAIN initial response");
        let payload = plain_payload(self.principal_email.as_str(), &token.value);
        Ok((Box::new(self.clone()), payload))
    }
}

#[async_trait]
impl StateMachine for GcpPlainMechanism {
    // single round trip: whatever the server says, we are done
    async fn next(&self, _challenge: &[u8]) -> Result<(bool, Option<Vec<u8>>), MechanismError> {
        Ok((true, None))
    }
}
