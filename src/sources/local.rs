use std::path::PathBuf;

use async_trait::async_trait;

use crate::cache::token::AccessToken;
use crate::error::TokenError;
use crate::sources::TokenProvider;

/// Reads the token from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    pub name: String,
}

impl EnvTokenProvider {
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn token(&self) -> Result<AccessToken, TokenError> {
        let value = std::env::var(&self.name).map_err(|source| TokenError::Env {
            name: self.name.to_owned(),
            source,
        })?;
        non_empty(value)
    }
}

/// Reads the token from a file on every call, so a sidecar can rotate it.
#[derive(Debug, Clone)]
pub struct FileTokenProvider {
    pub path: PathBuf,
}

impl FileTokenProvider {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl TokenProvider for FileTokenProvider {
    async fn token(&self) -> Result<AccessToken, TokenError> {
        let value = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| TokenError::File { path: self.path.clone(), source })?;
        non_empty(value)
    }
}

/// Always returns the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: AccessToken,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: AccessToken::new(token) }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<AccessToken, TokenError> {
        Ok(self.token.clone())
    }
}

fn non_empty(value: String) -> Result<AccessToken, TokenError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TokenError::Empty);
    }
    Ok(AccessToken::new(value))
}
