//! Shared constants and invariants

pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 60;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 500;

/// OAuth scope requested for discovered credentials
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Token-introspection endpoint; the access token is appended verbatim
pub const TOKEN_INFO_URL: &str = "https://www.googleapis.com/oauth2/v3/tokeninfo/?access_token=";

// Metadata server
pub const METADATA_ROOT: &str = "http://metadata.google.internal";
pub const METADATA_HOST_ENV: &str = "GCE_METADATA_HOST";
pub const METADATA_FLAVOR: &str = "metadata-flavor";
pub const METADATA_FLAVOR_VALUE: &str = "Google";
pub const METADATA_DEFAULT_SA_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default";

// Application default credentials
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const WELL_KNOWN_CREDENTIALS_PATH: &str = ".config/gcloud/application_default_credentials.json";

// Supported credentials JSON types
pub const CREDENTIALS_IMPERSONATED: &str = "impersonated_service_account";
pub const CREDENTIALS_AUTHORIZED_USER: &str = "authorized_user";

pub const PLAIN_MECHANISM: &str = "PLAIN";
