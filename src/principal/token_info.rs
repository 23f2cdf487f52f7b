use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::error::TokenInfoError;
use crate::observability::metrics::get_metrics;
use crate::sources::TokenProvider;

#[derive(Debug, Deserialize)]
struct TokenInfoResponse {
    #[serde(default)]
    email: Option<String>,
}

/// Sends a fresh access token to the token-introspection endpoint and returns
/// the `email` claim of the response. `token_info_url` is used as a prefix,
/// the token is appended verbatim. Single attempt, no retries.
pub async fn principal_email_from_token_info(
    token_provider: &dyn TokenProvider,
    client: &Client,
    token_info_url: &str,
) -> Result<String, TokenInfoError> {
    let token = token_provider
        .token()
        .await
        .map_err(TokenInfoError::TokenUnavailable)?;

    debug!("looking up principal email via token info endpoint");
    let timer = get_metrics().await.tokeninfo_duration.start_timer();
    let response = client
        .get(format!("{}{}", token_info_url, token.value))
        .send()
        .await
        .map_err(TokenInfoError::Transport)?;

    let status = response.status();
    let body = response.text().await.map_err(TokenInfoError::Transport)?;
    timer.observe_duration();

    if status != StatusCode::OK {
        return Err(TokenInfoError::Upstream { status, body });
    }

    let info: TokenInfoResponse = serde_json::from_str(&body).map_err(TokenInfoError::Decode)?;
    info.email
        .filter(|email| !email.is_empty())
        .ok_or(TokenInfoError::MissingEmailClaim)
}
