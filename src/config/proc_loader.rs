use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, error};

use crate::config::proc_validator;
use crate::config::settings::{LoggingConfig, ServiceConfig};
use crate::error::ConfigError;
use crate::observability::metrics::get_metrics;
use crate::utils::constants::DEFAULT_SAFETY_MARGIN_SECS;

static ENV_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}").expect("valid env placeholder regex"));

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;

    let expanded = expand_env_vars(&content);
    parse_config(&expanded).await
}

pub async fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    let metrics = get_metrics().await;
    let mut service_config: ServiceConfig = serde_yaml::from_str(content).inspect_err(|e| {
        error!("parse config error: {}", e);
        metrics.parse_failures.inc();
    })?;

    // Apply defaults
    if service_config.settings.logging.is_none() {
        service_config.settings.logging = Some(LoggingConfig::default());
    }
    if service_config.auth.safety_margin_seconds.is_none() {
        service_config.auth.safety_margin_seconds = Some(DEFAULT_SAFETY_MARGIN_SECS);
    }

    debug!("validation config ...");
    proc_validator::validate_service_config(&service_config).await?;

    Ok(service_config)
}

/// Replace `${VAR}` and `${VAR:default}` with the environment value, the
/// default, or an empty string.
pub fn expand_env_vars(input: &str) -> String {
    ENV_PLACEHOLDER
        .replace_all(input, |caps: &regex::Captures| {
            let var = &caps[1];
            let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var).unwrap_or_else(|_| default.to_string())
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{LogFormat, TokenSourceConfig};
    use serial_test::serial;
    use std::io::Write;

    #[test]
    #[serial]
    fn test_expand_env_vars() {
        std::env::set_var("GCP_SASL_TEST_EMAIL", "sa@proj.iam.gserviceaccount.com");
        std::env::remove_var("GCP_SASL_TEST_MISSING");

        let out = expand_env_vars("a: ${GCP_SASL_TEST_EMAIL}\nb: ${GCP_SASL_TEST_MISSING:fallback}\nc: '${GCP_SASL_TEST_MISSING}'");
        assert_eq!(out, "a: sa@proj.iam.gserviceaccount.com\nb: fallback\nc: ''");

        std::env::remove_var("GCP_SASL_TEST_EMAIL");
    }

    #[tokio::test]
    async fn test_parse_config_applies_defaults() {
        let cfg = parse_config("auth: {}\n").await.unwrap();
        let logging = cfg.settings.logging.unwrap();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, LogFormat::Compact);
        assert_eq!(cfg.auth.safety_margin_seconds, Some(60));
        assert!(!cfg.settings.metrics.is_enabled);
    }

    #[tokio::test]
    async fn test_parse_config_full() {
        let yaml = r#"
settings:
  logging:
    level: debug
    format: json
  retry:
    attempts: 3
    base_delay_ms: 100
    max_delay_ms: 1000
  metrics:
    is_enabled: true
auth:
  principal_email: sa@proj.iam.gserviceaccount.com
  token_source:
    url: http://127.0.0.1:8080/token
    headers:
      x-api-key: secret
  scope: https://www.googleapis.com/auth/cloud-platform
  safety_margin_seconds: 30
"#;
        let cfg = parse_config(yaml).await.unwrap();
        assert_eq!(cfg.settings.logging.unwrap().format, LogFormat::Json);
        assert_eq!(cfg.auth.safety_margin_seconds, Some(30));
        match cfg.auth.token_source.unwrap() {
            TokenSourceConfig::Http(http) => {
                assert_eq!(http.url, "http://127.0.0.1:8080/token");
                assert_eq!(http.headers.get("x-api-key").map(String::as_str), Some("secret"));
                assert_eq!(http.access_token_field, "access_token");
            }
            other => panic!("unexpected token source {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_parse_config_syntax_error() {
        let err = parse_config("auth: [unterminated").await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[tokio::test]
    async fn test_parse_config_rejects_invalid() {
        let yaml = "auth:\n  principal_email: not-an-email\n  token_source:\n    from_env: TOKEN\n";
        let err = parse_config(yaml).await.unwrap_err();
        match err {
            ConfigError::Invalid(errors) => assert!(errors.iter().any(|e| e.contains("auth.principal_email"))),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_file_to_config_expands_env() {
        std::env::set_var("GCP_SASL_TEST_TOKEN_FILE", "/var/run/secrets/token");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "auth:\n  principal_email: user@example.com\n  token_source:\n    path: ${{GCP_SASL_TEST_TOKEN_FILE}}").unwrap();

        let cfg = file_to_config(file.path()).await.unwrap();
        assert_eq!(
            cfg.auth.token_source,
            Some(TokenSourceConfig::FromFile { path: "/var/run/secrets/token".into() })
        );
        std::env::remove_var("GCP_SASL_TEST_TOKEN_FILE");
    }

    #[tokio::test]
    async fn test_file_to_config_missing_file() {
        let err = file_to_config(Path::new("/definitely/not/here.yaml")).await.unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
