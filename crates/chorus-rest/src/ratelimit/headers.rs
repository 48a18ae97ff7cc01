//! Rate-limit header parsing

use std::time::Duration;

use crate::transport::HttpResponse;

/// Rate-limit information carried by one response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateLimitHeaders {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    /// Time until the bucket refills
    pub reset_after: Option<Duration>,
    /// Delay requested by a 429
    pub retry_after: Option<Duration>,
    /// The 429 applies to every route
    pub global: bool,
    /// Platform bucket hash, for logs
    pub bucket: Option<String>,
}

impl RateLimitHeaders {
    /// Parse headers, using the wall clock for absolute reset times
    #[must_use]
    pub fn parse(response: &HttpResponse) -> Self {
        Self::parse_at(response, chrono::Utc::now().timestamp_millis())
    }

    /// Parse headers relative to `now_unix_ms`
    #[must_use]
    pub fn parse_at(response: &HttpResponse, now_unix_ms: i64) -> Self {
        let number = |name: &str| {
            response
                .header(name)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0)
        };

        // Relative reset wins over the absolute timestamp
        let reset_after = number("x-ratelimit-reset-after")
            .map(Duration::from_secs_f64)
            .or_else(|| {
                number("x-ratelimit-reset").map(|epoch_secs| {
                    let reset_ms = (epoch_secs * 1000.0).round() as i64;
                    Duration::from_millis(reset_ms.saturating_sub(now_unix_ms).max(0) as u64)
                })
            });

        let retry_after = number("retry-after")
            .map(Duration::from_secs_f64)
            .or_else(|| body_retry_after(&response.body));

        let global = response
            .header("x-ratelimit-global")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
            || response
                .header("x-ratelimit-scope")
                .is_some_and(|v| v.eq_ignore_ascii_case("global"));

        Self {
            limit: number("x-ratelimit-limit").map(|v| v as u32),
            remaining: number("x-ratelimit-remaining").map(|v| v as u32),
            reset_after,
            retry_after,
            global,
            bucket: response.header("x-ratelimit-bucket").map(str::to_string),
        }
    }
}

/// `retry_after` (seconds) from a 429 JSON body
fn body_retry_after(body: &[u8]) -> Option<Duration> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("retry_after")
        .and_then(serde_json::Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(Duration::from_secs_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn response(headers: &[(&str, &str)], body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: headers
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<HashMap<_, _>>(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_parse_bucket_headers() {
        let parsed = RateLimitHeaders::parse_at(
            &response(
                &[
                    ("x-ratelimit-limit", "5"),
                    ("x-ratelimit-remaining", "0"),
                    ("x-ratelimit-reset-after", "1.5"),
                    ("x-ratelimit-bucket", "abcd"),
                ],
                "",
            ),
            0,
        );

        assert_eq!(parsed.limit, Some(5));
        assert_eq!(parsed.remaining, Some(0));
        assert_eq!(parsed.reset_after, Some(Duration::from_millis(1500)));
        assert_eq!(parsed.bucket.as_deref(), Some("abcd"));
        assert!(!parsed.global);
    }

    #[test]
    fn test_absolute_reset_fallback() {
        let parsed = RateLimitHeaders::parse_at(
            &response(&[("x-ratelimit-reset", "1470173023.123")], ""),
            1_470_173_022_000,
        );
        assert_eq!(parsed.reset_after, Some(Duration::from_millis(1123)));

        // Already in the past
        let parsed = RateLimitHeaders::parse_at(
            &response(&[("x-ratelimit-reset", "10")], ""),
            1_470_173_022_000,
        );
        assert_eq!(parsed.reset_after, Some(Duration::ZERO));
    }

    #[test]
    fn test_retry_after_sources() {
        let from_header = RateLimitHeaders::parse_at(&response(&[("retry-after", "2")], ""), 0);
        assert_eq!(from_header.retry_after, Some(Duration::from_secs(2)));

        let from_body = RateLimitHeaders::parse_at(
            &response(&[], r#"{"message": "You are being rate limited.", "retry_after": 0.25, "global": false}"#),
            0,
        );
        assert_eq!(from_body.retry_after, Some(Duration::from_millis(250)));

        let none = RateLimitHeaders::parse_at(&response(&[], "not json"), 0);
        assert_eq!(none.retry_after, None);
    }

    #[test]
    fn test_global_flags() {
        let by_flag = RateLimitHeaders::parse_at(&response(&[("x-ratelimit-global", "true")], ""), 0);
        assert!(by_flag.global);

        let by_scope = RateLimitHeaders::parse_at(&response(&[("x-ratelimit-scope", "global")], ""), 0);
        assert!(by_scope.global);

        let user_scope = RateLimitHeaders::parse_at(&response(&[("x-ratelimit-scope", "user")], ""), 0);
        assert!(!user_scope.global);
    }
}
