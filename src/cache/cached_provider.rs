use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::token::AccessToken;
use crate::error::TokenError;
use crate::sources::TokenProvider;

/// Reuses the inner provider's token until it is within
/// `safety_margin_seconds` of expiry. Tokens without an expiry are not cached.
///
/// The lock is held across the refresh so concurrent handshakes share one
/// upstream request.
pub struct CachedTokenProvider<P> {
    inner: P,
    safety_margin_seconds: u64,
    current: Mutex<Option<AccessToken>>,
}

impl<P: TokenProvider> CachedTokenProvider<P> {
    pub fn new(inner: P, safety_margin_seconds: u64) -> Self {
        Self { inner, safety_margin_seconds, current: Mutex::new(None) }
    }
}

#[async_trait]
impl<P: TokenProvider> TokenProvider for CachedTokenProvider<P> {
    async fn token(&self) -> Result<AccessToken, TokenError> {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref().filter(|t| t.is_fresh(self.safety_margin_seconds)) {
            return Ok(token.clone());
        }

        debug!("refreshing cached access token");
        let token = self.inner.token().await?;
        *current = token.exp_unix_ts.map(|_| token.clone());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::time::now_u64;
    use crate::sources::MockTokenProvider;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_reuses_fresh_token() {
        let mut inner = MockTokenProvider::new();
        inner
            .expect_token()
            .times(1)
            .returning(|| Ok(AccessToken::with_expiry("cached", now_u64() + 3600)));

        let cached = Arc::new(CachedTokenProvider::new(inner, 60));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cached = cached.clone();
                tokio::spawn(async move { cached.token().await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().value, "cached");
        }
    }

    #[tokio::test]
    async fn test_refreshes_inside_safety_margin() {
        let mut inner = MockTokenProvider::new();
        inner
            .expect_token()
            .times(2)
            .returning(|| Ok(AccessToken::with_expiry("short", now_u64() + 10)));

        let cached = CachedTokenProvider::new(inner, 60);
        cached.token().await.unwrap();
        cached.token().await.unwrap();
    }

    #[tokio::test]
    async fn test_does_not_cache_errors_or_tokens_without_expiry() {
        let mut inner = MockTokenProvider::new();
        let mut seq = mockall::Sequence::new();
        inner
            .expect_token()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(TokenError::Other("boom".into())));
        inner
            .expect_token()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|| Ok(AccessToken::new("no-expiry")));

        let cached = CachedTokenProvider::new(inner, 60);
        assert!(cached.token().await.is_err());
        assert_eq!(cached.token().await.unwrap().value, "no-expiry");
        assert_eq!(cached.token().await.unwrap().value, "no-expiry");
    }
}
