use tokio::time::{sleep, Duration};
use tracing::{error, warn};

use crate::config::settings::RetryConfig;

const DEFAULT_ATTEMPTS: u32 = 1;
const DEFAULT_BASE_DELAY_MS: u64 = 200;
const DEFAULT_MAX_DELAY_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl RetrySettings {
    /// Missing fields fall back to a single attempt with default delays.
    pub fn from_config(cfg: Option<&RetryConfig>) -> Self {
        let defaults = Self::default();
        match cfg {
            Some(cfg) => Self {
                attempts: cfg.attempts.unwrap_or(defaults.attempts).max(1),
                base_delay_ms: cfg.base_delay_ms.unwrap_or(defaults.base_delay_ms),
                max_delay_ms: cfg.max_delay_ms.unwrap_or(defaults.max_delay_ms),
            },
            None => defaults,
        }
    }

    /// Runs `operation` until it succeeds or attempts run out, doubling the
    /// delay between attempts up to `max_delay_ms`.
    pub async fn run_with_retry<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let attempts = self.attempts.max(1);
        let mut delay = self.base_delay_ms;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    warn!("Attempt {attempt}/{attempts} failed: {e}");
                    sleep(Duration::from_millis(delay)).await;
                    delay = delay.saturating_mul(2).min(self.max_delay_ms);
                    attempt += 1;
                }
                Err(e) => {
                    error!("all {attempt} attempts failed: {e}");
                    return Err(e);
                }
            }
        }
    }
}
