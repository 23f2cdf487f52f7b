use std::fmt;

use crate::helpers::time::now_u64;

/// Short-lived bearer token as returned by a token provider.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub exp_unix_ts: Option<u64>, // UNIX TIMESTAMP
}

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into(), exp_unix_ts: None }
    }

    pub fn with_expiry(value: impl Into<String>, exp_unix_ts: u64) -> Self {
        Self { value: value.into(), exp_unix_ts: Some(exp_unix_ts) }
    }

    /// Build from an `expires_in` seconds value relative to now.
    pub fn expiring_in(value: impl Into<String>, expires_in: Option<u64>) -> Self {
        Self {
            value: value.into(),
            exp_unix_ts: expires_in.map(|secs| now_u64().saturating_add(secs)),
        }
    }

    /// True when the token is usable for at least `safety_margin_seconds` more.
    /// Tokens without expiry are never considered fresh.
    pub fn is_fresh(&self, safety_margin_seconds: u64) -> bool {
        self.exp_unix_ts
            .map(|exp| now_u64().saturating_add(safety_margin_seconds) < exp)
            .unwrap_or(false)
    }
}

// never print the secret
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[redacted]")
            .field("exp_unix_ts", &self.exp_unix_ts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freshness() {
        let now = now_u64();
        assert!(AccessToken::with_expiry("a", now + 120).is_fresh(60));
        assert!(!AccessToken::with_expiry("a", now + 30).is_fresh(60));
        assert!(!AccessToken::new("a").is_fresh(0));
        assert!(!AccessToken::with_expiry("a", now + 120).is_fresh(u64::MAX));
    }

    #[test]
    fn test_huge_expires_in_saturates() {
        let token = AccessToken::expiring_in("a", Some(u64::MAX));
        assert_eq!(token.exp_unix_ts, Some(u64::MAX));
        assert!(token.is_fresh(60));
    }

    #[test]
    fn test_debug_redacts_value() {
        let printed = format!("{:?}", AccessToken::new("super-secret"));
        assert!(!printed.contains("super-secret"));
    }
}
