use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::cached_provider::CachedTokenProvider;
use crate::config::settings::TokenSourceConfig;
use crate::credentials::Credentials;
use crate::error::CredentialError;
use crate::sources::metadata::{EnvironmentProbe, MetadataClient};
use crate::sources::{build_token_provider, TokenProvider};
use crate::utils::constants::{CREDENTIALS_ENV, WELL_KNOWN_CREDENTIALS_PATH};

/// Finds the ambient credentials of the process.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialDiscovery: Send + Sync {
    async fn find_default_credentials(&self, scope: &str) -> Result<Credentials, CredentialError>;
}

/// Application default credentials lookup.
///
/// Credentials JSON, first found:
/// 1. the explicitly configured credentials file
/// 2. `GOOGLE_APPLICATION_CREDENTIALS`
/// 3. `$HOME/.config/gcloud/application_default_credentials.json`, if it exists
///
/// Token provider: the configured token source, else the metadata server
/// when one is reachable.
#[derive(Debug, Clone)]
pub struct DefaultCredentialDiscovery {
    metadata: MetadataClient,
    token_source: Option<TokenSourceConfig>,
    credentials_file: Option<PathBuf>,
    safety_margin_seconds: u64,
}

impl DefaultCredentialDiscovery {
    pub fn new(metadata: MetadataClient, safety_margin_seconds: u64) -> Self {
        Self { metadata, token_source: None, credentials_file: None, safety_margin_seconds }
    }

    pub fn with_token_source(mut self, token_source: Option<TokenSourceConfig>) -> Self {
        self.token_source = token_source;
        self
    }

    pub fn with_credentials_file(mut self, credentials_file: Option<PathBuf>) -> Self {
        self.credentials_file = credentials_file;
        self
    }

    async fn credentials_json(&self) -> Result<Option<Vec<u8>>, CredentialError> {
        if let Some(path) = &self.credentials_file {
            debug!("reading credentials file from config");
            return read_json(path).await.map(Some);
        }
        if let Some(path) = std::env::var_os(CREDENTIALS_ENV).filter(|p| !p.is_empty()) {
            debug!("reading credentials file from {} env var", CREDENTIALS_ENV);
            return read_json(Path::new(&path)).await.map(Some);
        }
        if let Some(home) = std::env::var_os("HOME") {
            let path = Path::new(&home).join(WELL_KNOWN_CREDENTIALS_PATH);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                debug!("reading well-known gcloud credentials file");
                return read_json(&path).await.map(Some);
            }
        }
        Ok(None)
    }

    async fn token_provider(&self, scope: &str) -> Result<Arc<dyn TokenProvider>, CredentialError> {
        if let Some(token_source) = &self.token_source {
            return Ok(build_token_provider(token_source, &self.metadata, scope, self.safety_margin_seconds));
        }
        if self.metadata.is_metadata_environment().await {
            debug!("using metadata server token provider");
            return Ok(Arc::new(CachedTokenProvider::new(
                self.metadata.token_provider(scope),
                self.safety_margin_seconds,
            )));
        }
        Err(CredentialError::NoTokenSource)
    }
}

#[async_trait]
impl CredentialDiscovery for DefaultCredentialDiscovery {
    async fn find_default_credentials(&self, scope: &str) -> Result<Credentials, CredentialError> {
        let json = self.credentials_json().await?;
        let token_provider = self.token_provider(scope).await?;
        Ok(Credentials::new(json, token_provider))
    }
}

async fn read_json(path: &Path) -> Result<Vec<u8>, CredentialError> {
    tokio::fs::read(path).await.map_err(|source| CredentialError::Read {
        path: path.to_path_buf(),
        source,
    })
}
