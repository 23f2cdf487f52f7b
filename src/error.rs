//! Error types for principal resolution, token sources and the PLAIN mechanism.
//!
//! Every outer layer wraps the inner one and prefixes it with a short
//! description of what was being attempted.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Rejections produced by the principal email validator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Direct Workload Identity Federation identities cannot be used with PLAIN.
    #[error(
        "SASL PLAIN OAuth cannot be used with direct Workload Identity Federation ('{0}') - \
         you must configure KSA --> GSA impersonation, see: \
         https://cloud.google.com/kubernetes-engine/docs/how-to/workload-identity#kubernetes-sa-to-iam"
    )]
    UnsupportedIdentityType(String),

    #[error("invalid email address '{address}': {reason}")]
    MalformedAddress { address: String, reason: String },
}

/// The impersonation URL did not contain anything shaped like an email.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unable to extract email from impersonation URL: {url}")]
pub struct ImpersonationUrlError {
    pub url: String,
}

/// Failures of a token provider.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("unable to decode token response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("token response has no '{0}' field")]
    MissingField(String),

    #[error("unable to read token from env var '{name}': {source}")]
    Env {
        name: String,
        #[source]
        source: std::env::VarError,
    },

    #[error("unable to read token file '{}': {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("token is empty")]
    Empty,

    #[error("{0}")]
    Other(String),
}

/// Failures talking to the Compute metadata server.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("metadata request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("metadata server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("metadata server returned an empty value")]
    Empty,
}

/// Failures of the token-introspection email lookup.
#[derive(Error, Debug)]
pub enum TokenInfoError {
    #[error("error fetching access token for principal email lookup: {0}")]
    TokenUnavailable(#[source] TokenError),

    #[error("token info request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("got {status} response code: {body}")]
    Upstream { status: StatusCode, body: String },

    #[error("error decoding token info response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("got empty email in token info response")]
    MissingEmailClaim,
}

/// Failures of principal email resolution.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("detected metadata server, but unable to get service account email for default: {0}")]
    MetadataFetch(#[source] MetadataError),

    #[error("principal email did not pass validation: {0}")]
    InvalidPrincipalEmail(#[source] ValidationError),

    #[error("error decoding credentials JSON: {0}")]
    JsonDecode(#[source] serde_json::Error),

    #[error("unsupported JSON credentials type: '{0}'")]
    UnsupportedTokenType(String),

    #[error("no credentials type detected in JSON credentials")]
    NoTokenTypeDetected,

    #[error(transparent)]
    ImpersonationUrl(#[from] ImpersonationUrlError),

    #[error("error looking up principal email via token info: {0}")]
    TokenInfo(#[source] TokenInfoError),

    #[error("unable to determine principal email, did not detect metadata server or JSON credentials")]
    PrincipalEmailUndeterminable,
}

/// Failures of ambient credential discovery.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("unable to read credentials file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no token source available: configure a token source, or run where a metadata server is reachable")]
    NoTokenSource,
}

/// Failures constructing or driving the PLAIN mechanism.
#[derive(Error, Debug)]
pub enum MechanismError {
    #[error("error finding application default credentials: {0}")]
    CredentialDiscovery(#[source] CredentialError),

    #[error("error fetching principal email for application default credentials: {0}")]
    Resolution(#[source] ResolutionError),

    #[error("principal email did not pass validation: {0}")]
    InvalidPrincipalEmail(#[source] ValidationError),

    #[error("token source did not return a valid token: {0}")]
    TokenSourceInvalid(#[source] TokenError),

    #[error("error generating token: {0}")]
    TokenFetch(#[source] TokenError),
}

/// Problems found in the YAML configuration, aggregated.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("config is not valid, total errors: {}\n{}", .0.len(), .0.join("\n"))]
    Invalid(Vec<String>),
}
