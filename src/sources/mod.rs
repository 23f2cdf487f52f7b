//! Token providers
//!
//! Everything that can hand out an access token on demand. The mechanism and
//! the token-info lookup only see the [`TokenProvider`] trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::cached_provider::CachedTokenProvider;
use crate::cache::token::AccessToken;
use crate::config::settings::TokenSourceConfig;
use crate::error::TokenError;

pub mod http;
pub mod local;
pub mod metadata;

use http::HttpTokenProvider;
use local::{EnvTokenProvider, FileTokenProvider};
use metadata::MetadataClient;

/// Produces access tokens. Implementations must be safe to share between
/// connections that authenticate concurrently.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<AccessToken, TokenError>;
}

#[async_trait]
impl<T: TokenProvider + ?Sized> TokenProvider for Arc<T> {
    async fn token(&self) -> Result<AccessToken, TokenError> {
        (**self).token().await
    }
}

/// Build a provider from the `auth.token_source` config block.
///
/// Remote sources (HTTP, metadata) are wrapped in a cache honouring
/// `safety_margin_seconds`; env and file sources are re-read on every call.
/// The HTTP source reuses the metadata client's `reqwest::Client`, so its
/// timeouts are the caller's.
pub fn build_token_provider(
    cfg: &TokenSourceConfig,
    metadata: &MetadataClient,
    scope: &str,
    safety_margin_seconds: u64,
) -> Arc<dyn TokenProvider> {
    match cfg {
        TokenSourceConfig::Http(http_cfg) => Arc::new(CachedTokenProvider::new(
            HttpTokenProvider::with_client(http_cfg.clone(), metadata.http_client().clone()),
            safety_margin_seconds,
        )),
        TokenSourceConfig::Metadata { .. } => Arc::new(CachedTokenProvider::new(
            metadata.token_provider(scope),
            safety_margin_seconds,
        )),
        TokenSourceConfig::FromEnv { from_env } => Arc::new(EnvTokenProvider::new(from_env.to_owned())),
        TokenSourceConfig::FromFile { path } => Arc::new(FileTokenProvider::new(path.into())),
    }
}
