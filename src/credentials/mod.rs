//! Credentials and their discovery
//!
//! A [`Credentials`] bundle pairs the raw credentials JSON (when there is one)
//! with the token provider that acts for it.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::sources::TokenProvider;
use crate::utils::constants::{CREDENTIALS_AUTHORIZED_USER, CREDENTIALS_IMPERSONATED};

pub mod discovery;

pub use discovery::{CredentialDiscovery, DefaultCredentialDiscovery};

#[derive(Clone)]
pub struct Credentials {
    pub json: Option<Vec<u8>>,
    pub token_provider: Arc<dyn TokenProvider>,
}

impl Credentials {
    pub fn new(json: Option<Vec<u8>>, token_provider: Arc<dyn TokenProvider>) -> Self {
        Self { json, token_provider }
    }

    /// Raw JSON, if present and non-empty.
    pub fn json(&self) -> Option<&[u8]> {
        self.json.as_deref().filter(|json| !json.is_empty())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("json_bytes", &self.json.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

/// The two fields of the credentials JSON that matter for principal resolution.
#[derive(Debug, Default, Deserialize)]
struct RawDescriptor {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    service_account_impersonation_url: Option<String>,
}

/// Credentials JSON classified by its declared `type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsDescriptor {
    ImpersonatedServiceAccount { impersonation_url: String },
    AuthorizedUser,
    /// `type` absent or empty
    Untyped,
    Unsupported(String),
}

impl CredentialsDescriptor {
    pub fn from_json(json: &[u8]) -> Result<Self, serde_json::Error> {
        // a bare `null` document carries no type
        let raw: RawDescriptor = serde_json::from_slice::<Option<RawDescriptor>>(json)?.unwrap_or_default();
        Ok(match raw.kind.unwrap_or_default().as_str() {
            CREDENTIALS_IMPERSONATED => CredentialsDescriptor::ImpersonatedServiceAccount {
                impersonation_url: raw.service_account_impersonation_url.unwrap_or_default(),
            },
            CREDENTIALS_AUTHORIZED_USER => CredentialsDescriptor::AuthorizedUser,
            "" => CredentialsDescriptor::Untyped,
            other => CredentialsDescriptor::Unsupported(other.to_owned()),
        })
    }
}
