//! Configuration validation with aggregated errors.
//! - Collects every issue into Vec<String> before failing
//! - Checks logging and retry invariants
//! - Checks the auth block: principal email syntax, absolute URLs, token
//!   source shape, and that the explicit principal/token pair is complete

use tracing::{error, info};

use crate::config::settings::{AuthConfig, RetryConfig, ServiceConfig, SettingsConfig, TokenSourceConfig};
use crate::error::ConfigError;
use crate::observability::metrics::get_metrics;
use crate::principal::validate_principal_email;

const MAX_SAFETY_MARGIN_SECS: u64 = 60 * 60 * 24;

/// Public entrypoint: returns Ok(()) or every issue found.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_auth(&cfg.auth, &mut errors);

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        get_metrics().await.config_validation_errors.inc();
        Err(ConfigError::Invalid(errors))
    }
}

/// SETTINGS VALIDATION
fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if let Some(retry) = &settings.retry {
        validate_retry("settings.retry", retry, errors);
    }

    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }
}

fn validate_retry(path: &str, retry: &RetryConfig, errors: &mut Vec<String>) {
    if retry.attempts == Some(0) {
        errors.push(format!("{}.attempts must be > 0", path));
    }
    if let (Some(base), Some(max)) = (retry.base_delay_ms, retry.max_delay_ms) {
        if max < base {
            errors.push(format!(
                "{}.max_delay_ms ({}) must be >= base_delay_ms ({})",
                path, max, base
            ));
        }
    }
}

/// AUTH VALIDATION
fn validate_auth(auth: &AuthConfig, errors: &mut Vec<String>) {
    match (&auth.principal_email, &auth.token_source) {
        (Some(email), Some(_)) => {
            if let Err(e) = validate_principal_email(email) {
                errors.push(format!("auth.principal_email '{}' invalid: {}", email, e));
            }
        }
        (Some(_), None) => {
            errors.push("auth.principal_email requires auth.token_source".to_string());
        }
        (None, _) => {}
    }

    if let Some(token_source) = &auth.token_source {
        validate_token_source(token_source, errors);
    }

    if let Some(url) = &auth.token_info_url {
        validate_absolute_url("auth.token_info_url", url, errors);
    }
    if let Some(host) = &auth.metadata_host {
        if host.trim().is_empty() || host.contains('/') {
            errors.push(format!("auth.metadata_host '{}' must be host[:port]", host));
        }
    }
    if auth.metadata_probe_timeout_ms == Some(0) {
        errors.push("auth.metadata_probe_timeout_ms must be > 0".to_string());
    }
    if let Some(path) = &auth.credentials_file {
        if path.trim().is_empty() {
            errors.push("auth.credentials_file cannot be empty".to_string());
        }
    }
    if let Some(scope) = &auth.scope {
        if scope.trim().is_empty() {
            errors.push("auth.scope cannot be empty".to_string());
        }
    }
    if let Some(s) = auth.safety_margin_seconds {
        if s > MAX_SAFETY_MARGIN_SECS {
            errors.push(format!("auth.safety_margin_seconds ({}) is unreasonably large", s));
        }
    }
}

fn validate_token_source(token_source: &TokenSourceConfig, errors: &mut Vec<String>) {
    match token_source {
        TokenSourceConfig::Http(http) => {
            validate_absolute_url("auth.token_source.url", &http.url, errors);
            if http.access_token_field.trim().is_empty() {
                errors.push("auth.token_source.access_token_field cannot be empty".to_string());
            }
            if http.expires_in_field.trim().is_empty() {
                errors.push("auth.token_source.expires_in_field cannot be empty".to_string());
            }
            for name in http.headers.keys() {
                if http::HeaderName::from_bytes(name.as_bytes()).is_err() {
                    errors.push(format!("auth.token_source.headers: '{}' is not a valid header name", name));
                }
            }
        }
        TokenSourceConfig::Metadata { metadata } => {
            if !metadata {
                errors.push("auth.token_source.metadata must be true when set".to_string());
            }
        }
        TokenSourceConfig::FromEnv { from_env } => {
            if from_env.trim().is_empty() {
                errors.push("auth.token_source.from_env: env name cannot be empty".to_string());
            }
        }
        TokenSourceConfig::FromFile { path } => {
            if path.trim().is_empty() {
                errors.push("auth.token_source.path cannot be empty".to_string());
            }
        }
    }
}

fn validate_absolute_url(path: &str, url: &str, errors: &mut Vec<String>) {
    match url.parse::<http::Uri>() {
        Ok(uri) if matches!(uri.scheme_str(), Some("http" | "https")) && uri.host().is_some() => {}
        _ => errors.push(format!("{}: '{}' must be an absolute http(s) URL", path, url)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{HttpTokenSourceConfig, LoggingConfig};

    fn invalid(err: ConfigError) -> Vec<String> {
        match err {
            ConfigError::Invalid(errors) => errors,
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_default_config_is_valid() {
        validate_service_config(&ServiceConfig::default()).await.unwrap();
    }

    #[tokio::test]
    async fn test_explicit_pair_is_valid() {
        let mut cfg = ServiceConfig::default();
        cfg.auth.principal_email = Some("sa@proj.iam.gserviceaccount.com".into());
        cfg.auth.token_source = Some(TokenSourceConfig::Http(HttpTokenSourceConfig::new("https://sidecar.local/token")));
        validate_service_config(&cfg).await.unwrap();
    }

    #[tokio::test]
    async fn test_errors_are_aggregated() {
        let mut cfg = ServiceConfig::default();
        cfg.settings.logging = Some(LoggingConfig::new("loud".into(), Default::default()));
        cfg.settings.retry = Some(RetryConfig { attempts: Some(0), base_delay_ms: Some(500), max_delay_ms: Some(100) });
        cfg.auth.principal_email = Some("my-ksa@proj.svc.id.goog".into());
        cfg.auth.token_source = Some(TokenSourceConfig::Http(HttpTokenSourceConfig::new("/relative/token")));
        cfg.auth.token_info_url = Some("ftp://example.com/".into());

        let errors = invalid(validate_service_config(&cfg).await.unwrap_err());
        assert_eq!(errors.len(), 6, "{errors:#?}");
        assert!(errors.iter().any(|e| e.contains("settings.logging.level")));
        assert!(errors.iter().any(|e| e.contains("attempts must be > 0")));
        assert!(errors.iter().any(|e| e.contains("max_delay_ms")));
        assert!(errors.iter().any(|e| e.contains("auth.principal_email")));
        assert!(errors.iter().any(|e| e.contains("auth.token_source.url")));
        assert!(errors.iter().any(|e| e.contains("auth.token_info_url")));
    }

    #[tokio::test]
    async fn test_principal_email_requires_token_source() {
        let mut cfg = ServiceConfig::default();
        cfg.auth.principal_email = Some("user@example.com".into());

        let errors = invalid(validate_service_config(&cfg).await.unwrap_err());
        assert_eq!(errors, vec!["auth.principal_email requires auth.token_source".to_string()]);
    }

    #[tokio::test]
    async fn test_token_source_without_principal_is_valid() {
        let mut cfg = ServiceConfig::default();
        cfg.auth.token_source = Some(TokenSourceConfig::FromEnv { from_env: "ACCESS_TOKEN".into() });
        validate_service_config(&cfg).await.unwrap();
    }

    #[tokio::test]
    async fn test_metadata_host_and_empty_sources() {
        let mut cfg = ServiceConfig::default();
        cfg.auth.metadata_host = Some("http://169.254.169.254/".into());
        cfg.auth.token_source = Some(TokenSourceConfig::FromFile { path: " ".into() });

        let errors = invalid(validate_service_config(&cfg).await.unwrap_err());
        assert_eq!(errors.len(), 2, "{errors:#?}");
    }
}
