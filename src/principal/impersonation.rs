use std::sync::LazyLock;

use regex::Regex;

use crate::error::ImpersonationUrlError;

static EMAIL_IN_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._-]+@[a-zA-Z0-9._-]+\.[a-zA-Z0-9_-]+").expect("email pattern compiles")
});

/// Extracts the service account email from an impersonation URL, for example
/// `https://iamcredentials.googleapis.com/v1/projects/-/serviceAccounts/gmk@my-project.iam.gserviceaccount.com:generateAccessToken`
/// yields `gmk@my-project.iam.gserviceaccount.com`.
pub fn email_from_impersonation_url(url: &str) -> Result<String, ImpersonationUrlError> {
    EMAIL_IN_URL
        .find(url)
        .map(|m| m.as_str().to_owned())
        .ok_or_else(|| ImpersonationUrlError { url: url.to_owned() })
}
