use chrono::Utc;

use crate::utils::constants::DEFAULT_SAFETY_MARGIN_SECS;

pub fn get_token_safety_margin_seconds(safety_margin_seconds: Option<u64>) -> u64 {
    safety_margin_seconds.unwrap_or(DEFAULT_SAFETY_MARGIN_SECS)
}

pub fn now_u64() -> u64 {
    now_i64().max(0) as u64
}

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}
