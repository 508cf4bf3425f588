use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::date;

/// Header carrying the hourly request allowance
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
/// Header carrying the requests left this hour
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
/// Header carrying the reset instant in epoch seconds
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Request allowance of an account or an IP address
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitStatus {
    /// Requests allowed per hour
    pub hourly_limit: u32,
    /// Requests left before the reset
    pub remaining_hits: u32,
    /// Reset instant in epoch seconds
    pub reset_time_in_seconds: i64,
    /// Reset instant as a timestamp
    #[serde(with = "date")]
    pub reset_time: Option<DateTime<FixedOffset>>,
}

impl RateLimitStatus {
    /// Build from `X-RateLimit-*` response headers (lower-cased names)
    ///
    /// Returns `None` unless all three headers are present and numeric.
    #[must_use]
    pub fn from_headers(headers: &HashMap<String, String>) -> Option<Self> {
        let limit = headers.get(LIMIT_HEADER)?.trim().parse().ok()?;
        let remaining = headers.get(REMAINING_HEADER)?.trim().parse().ok()?;
        let reset: i64 = headers.get(RESET_HEADER)?.trim().parse().ok()?;
        let reset_time = Utc
            .timestamp_opt(reset, 0)
            .single()
            .map(|dt| dt.fixed_offset());

        Some(Self {
            hourly_limit: limit,
            remaining_hits: remaining,
            reset_time_in_seconds: reset,
            reset_time,
        })
    }

    /// Seconds until the allowance resets, never negative
    #[must_use]
    pub fn seconds_until_reset(&self) -> i64 {
        (self.reset_time_in_seconds - Utc::now().timestamp()).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::decode_body;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_from_headers() {
        let status = RateLimitStatus::from_headers(&headers(&[
            (LIMIT_HEADER, "150"),
            (REMAINING_HEADER, "149"),
            (RESET_HEADER, "1250000000"),
        ]))
        .unwrap();

        assert_eq!(status.hourly_limit, 150);
        assert_eq!(status.remaining_hits, 149);
        assert_eq!(status.reset_time.unwrap().timestamp(), 1_250_000_000);
        assert_eq!(status.seconds_until_reset(), 0);
    }

    #[test]
    fn test_from_headers_incomplete() {
        assert!(RateLimitStatus::from_headers(&headers(&[(LIMIT_HEADER, "150")])).is_none());
        assert!(RateLimitStatus::from_headers(&headers(&[
            (LIMIT_HEADER, "lots"),
            (REMAINING_HEADER, "1"),
            (RESET_HEADER, "1"),
        ]))
        .is_none());
    }

    #[test]
    fn test_decode_body() {
        let json = r#"{
            "remaining_hits": 20,
            "hourly_limit": 150,
            "reset_time_in_seconds": 1250000000,
            "reset_time": "Tue Aug 11 14:13:20 +0000 2009"
        }"#;
        let status: RateLimitStatus = decode_body(json).unwrap();
        assert_eq!(status.remaining_hits, 20);
        assert_eq!(status.reset_time.unwrap().timestamp(), 1_250_000_000);
    }
}
