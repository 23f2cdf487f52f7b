use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::cache::token::AccessToken;
use crate::config::settings::HttpTokenSourceConfig;
use crate::error::TokenError;
use crate::sources::TokenProvider;

/// Fetches tokens from an HTTP endpoint returning JSON, e.g. a local token sidecar.
#[derive(Debug, Clone)]
pub struct HttpTokenProvider {
    pub cfg: HttpTokenSourceConfig,
    pub client: Client,
}

impl HttpTokenProvider {
    pub fn new(cfg: HttpTokenSourceConfig) -> Self {
        Self::with_client(cfg, Client::new())
    }

    pub fn with_client(cfg: HttpTokenSourceConfig, client: Client) -> Self {
        Self { cfg, client }
    }
}

#[async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn token(&self) -> Result<AccessToken, TokenError> {
        let mut request = self.client.get(&self.cfg.url);

        // Build headers dynamically
        for (k, v) in &self.cfg.headers {
            request = request.header(k, v);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TokenError::Status { status, body });
        }
        parse_token_body(&body, &self.cfg.access_token_field, &self.cfg.expires_in_field)
    }
}

fn parse_token_body(body: &str, token_field: &str, expires_field: &str) -> Result<AccessToken, TokenError> {
    let json: Value = serde_json::from_str(body)?;
    let token = json
        .get(token_field)
        .and_then(Value::as_str)
        .ok_or_else(|| TokenError::MissingField(token_field.to_owned()))?;
    if token.is_empty() {
        return Err(TokenError::Empty);
    }
    // expires_in may arrive as an integer, a float or a numeric string
    let expires_in = json.get(expires_field).and_then(|v| match v {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.parse::<u64>().ok(),
        _ => None,
    });
    Ok(AccessToken::expiring_in(token, expires_in))
}
