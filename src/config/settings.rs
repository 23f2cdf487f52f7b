use std::collections::HashMap;

use serde::Deserialize;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// ================================
/// Global settings
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SettingsConfig {
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    pub attempts: Option<u32>,
    /// will be mutiply by 2 on every attempt until max_delay_ms
    pub base_delay_ms: Option<u64>,
    /// invariant: >= base_delay_ms
    pub max_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MetricsConfig {
    #[serde(default)]
    pub is_enabled: bool,
}

/// ================================
/// Authentication
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// set together with `token_source` to skip discovery and resolution
    pub principal_email: Option<String>,
    pub token_source: Option<TokenSourceConfig>,
    /// overrides GOOGLE_APPLICATION_CREDENTIALS
    pub credentials_file: Option<String>,
    /// host[:port] of the metadata server
    pub metadata_host: Option<String>,
    pub metadata_probe_timeout_ms: Option<u64>,
    pub token_info_url: Option<String>,
    pub scope: Option<String>,
    pub safety_margin_seconds: Option<u64>,
}

/// Where access tokens come from
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum TokenSourceConfig {
    Http(HttpTokenSourceConfig),
    Metadata {
        metadata: bool,
    },
    FromEnv {
        from_env: String,
    },
    FromFile {
        path: String,
    },
}

/// Token endpoint answering a GET with a JSON body
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HttpTokenSourceConfig {
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_access_token_field")]
    pub access_token_field: String,
    #[serde(default = "default_expires_in_field")]
    pub expires_in_field: String,
}

impl HttpTokenSourceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            access_token_field: default_access_token_field(),
            expires_in_field: default_expires_in_field(),
        }
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // allowed: trace, debug, info, warn, error
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: LogFormat::Compact }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Compact,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_access_token_field() -> String {
    "access_token".to_string()
}

fn default_expires_in_field() -> String {
    "expires_in".to_string()
}
