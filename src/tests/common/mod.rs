// tests/common/mod.rs
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use reqwest::Client;
use tempfile::NamedTempFile;

use crate::credentials::Credentials;
use crate::error::MetadataError;
use crate::sources::local::StaticTokenProvider;
use crate::sources::metadata::{MockEnvironmentProbe, MockMetadataService};
use crate::utils::constants::{CREDENTIALS_ENV, METADATA_HOST_ENV};

/// Nothing listens here; any request fails immediately.
pub const UNREACHABLE_HOST: &str = "127.0.0.1:1";

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

pub fn probe(on_metadata: bool) -> Arc<MockEnvironmentProbe> {
    let mut probe = MockEnvironmentProbe::new();
    probe.expect_is_metadata_environment().returning(move || on_metadata);
    Arc::new(probe)
}

/// Metadata service that must never be asked.
pub fn untouched_metadata() -> Arc<MockMetadataService> {
    let mut metadata = MockMetadataService::new();
    metadata.expect_default_service_account_email().times(0);
    Arc::new(metadata)
}

pub fn metadata_answering(answer: Result<&'static str, ()>) -> Arc<MockMetadataService> {
    let mut metadata = MockMetadataService::new();
    metadata
        .expect_default_service_account_email()
        .times(1)
        .returning(move || answer.map(str::to_owned).map_err(|_| MetadataError::Empty));
    Arc::new(metadata)
}

pub fn credentials(json: Option<&str>, token: &str) -> Credentials {
    Credentials::new(
        json.map(|json| json.as_bytes().to_vec()),
        Arc::new(StaticTokenProvider::new(token)),
    )
}

pub fn impersonated_json(target: &str) -> String {
    serde_json::json!({
        "type": "impersonated_service_account",
        "service_account_impersonation_url": format!(
            "https://iamcredentials.googleapis.com/v1/projects/-/serviceAccounts/{target}:generateAccessToken"
        ),
        "delegates": [],
        "source_credentials": {
            "type": "authorized_user",
            "client_id": "id.apps.googleusercontent.com",
            "client_secret": "secret",
            "refresh_token": "refresh"
        }
    })
    .to_string()
}

pub fn authorized_user_json() -> String {
    serde_json::json!({
        "type": "authorized_user",
        "client_id": "id.apps.googleusercontent.com",
        "client_secret": "secret",
        "refresh_token": "refresh"
    })
    .to_string()
}

pub fn write_credentials_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp credentials file");
    file.write_all(json.as_bytes()).expect("write credentials");
    file
}

/// Points HOME at `home` and clears the credential and metadata env vars,
/// restoring all of them on drop. Use from `#[serial]` tests only.
pub struct EnvGuard {
    saved: Vec<(&'static str, Option<OsString>)>,
}

impl EnvGuard {
    pub fn isolate(home: &Path) -> Self {
        let guard = Self {
            saved: ["HOME", CREDENTIALS_ENV, METADATA_HOST_ENV]
                .into_iter()
                .map(|name| (name, std::env::var_os(name)))
                .collect(),
        };
        std::env::set_var("HOME", home);
        std::env::remove_var(CREDENTIALS_ENV);
        std::env::remove_var(METADATA_HOST_ENV);
        guard
    }

    pub fn set(&mut self, name: &'static str, value: impl AsRef<std::ffi::OsStr>) {
        if !self.saved.iter().any(|(saved, _)| *saved == name) {
            self.saved.push((name, std::env::var_os(name)));
        }
        std::env::set_var(name, value);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in &self.saved {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }
    }
}
