// crates/network/src/headers.rs
//! Rate limit and Retry-After header parsing
//!
//! Malformed values are ignored; they never produce an error.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;
use threadline_resilience::parse_retry_after;

pub const RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Quota reported by the upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHeaders {
    /// Requests left in the window, never negative
    pub remaining: i64,
    /// `None` when the reset header is missing or malformed
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitHeaders {
    /// Returns the quota if the remaining count is present and well formed
    pub fn parse(headers: &HeaderMap) -> Option<Self> {
        let remaining = header_str(headers, RATELIMIT_REMAINING)?
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())?;
        let reset_at = header_str(headers, RATELIMIT_RESET)
            .and_then(|value| value.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        Some(Self {
            remaining: (remaining.trunc() as i64).max(0),
            reset_at,
        })
    }
}

/// Parses `Retry-After` relative to the current time
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    parse_retry_after(header_str(headers, RETRY_AFTER.as_str())?, Utc::now())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok().map(str::trim)
}
