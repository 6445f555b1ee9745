// Retry logic for upstream backend calls
// Author: kelexine (https://github.com/kelexine)

use backoff::{backoff::Backoff, ExponentialBackoff};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Longest wait we honour from an upstream hint.
const MAX_HINTED_DELAY: Duration = Duration::from_secs(60);

/// A failed upstream attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptError {
    /// HTTP status, or 0 when the request never got a response.
    pub status: u16,
    pub body: String,
    /// Delay suggested by a `Retry-After` header, if any.
    pub retry_after: Option<Duration>,
}

impl AttemptError {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
        }
    }
}

/// Read a retry hint from an error body: `{"error": {"retryDelay": "1.5s"}}`
/// or `{"retry_after": 2}` (seconds). Capped at 60 seconds.
pub fn parse_retry_delay(error_json: &str) -> Option<Duration> {
    let parsed: Value = serde_json::from_str(error_json).ok()?;

    if let Some(delay) = parsed
        .get("error")
        .and_then(|e| e.get("retryDelay"))
        .and_then(Value::as_str)
    {
        return parse_duration_string(delay);
    }

    let seconds = parsed.get("retry_after")?.as_f64()?;
    Some(cap(seconds))
}

/// Parse duration strings like "0.457s", "40s", "1.5s"
fn parse_duration_string(duration_str: &str) -> Option<Duration> {
    let seconds: f64 = duration_str.strip_suffix('s')?.parse().ok()?;
    Some(cap(seconds))
}

/// Parse a `Retry-After` header value given in seconds
pub fn parse_retry_after_header(value: &str) -> Option<Duration> {
    let seconds: f64 = value.trim().parse().ok()?;
    Some(cap(seconds))
}

fn cap(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(seconds.min(MAX_HINTED_DELAY.as_secs_f64()))
}

/// Create exponential backoff configuration for retries
pub fn create_backoff() -> ExponentialBackoff {
    ExponentialBackoff {
        current_interval: Duration::from_millis(250),
        initial_interval: Duration::from_millis(250),
        randomization_factor: 0.3,
        multiplier: 2.0,
        max_interval: Duration::from_secs(10),
        max_elapsed_time: Some(Duration::from_secs(60)),
        ..Default::default()
    }
}

/// Determine if an attempt is worth repeating. Status 0 means a transport
/// failure (connection refused, timeout).
pub fn is_retryable(status: u16) -> bool {
    matches!(status, 0 | 429 | 500 | 502 | 503 | 504)
}

/// Run `operation` until it succeeds, fails with a non-retryable status, or
/// `max_attempts` is reached. Upstream hints win over exponential backoff.
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    max_attempts: u32,
    mut operation: F,
) -> Result<T, AttemptError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, AttemptError>>,
{
    let mut backoff = create_backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(err) => {
                if !is_retryable(err.status) || attempt >= max_attempts.max(1) {
                    return Err(err);
                }

                let delay = match err.retry_after.or_else(|| parse_retry_delay(&err.body)) {
                    Some(hinted) => hinted,
                    None => backoff.next_backoff().unwrap_or(Duration::from_secs(10)),
                };
                debug!(
                    "{} failed with {} (attempt {}), retrying after {}ms",
                    operation_name,
                    err.status,
                    attempt,
                    delay.as_millis()
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_parse_retry_delay() {
        let body = r#"{"error": {"code": 429, "retryDelay": "0.457s"}}"#;
        assert_eq!(parse_retry_delay(body).unwrap().as_millis(), 457);

        assert_eq!(parse_retry_delay(r#"{"retry_after": 2}"#).unwrap().as_secs(), 2);
        assert_eq!(parse_retry_delay("plain text"), None);
        assert_eq!(parse_retry_delay(r#"{"error": "nope"}"#), None);
    }

    #[test]
    fn test_hints_are_capped() {
        assert_eq!(parse_duration_string("120s").unwrap().as_secs(), 60);
        assert_eq!(parse_retry_after_header(" 300 ").unwrap().as_secs(), 60);
        assert_eq!(parse_retry_after_header("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_is_retryable() {
        assert!(is_retryable(0));
        assert!(is_retryable(429));
        assert!(is_retryable(503));
        assert!(!is_retryable(400));
        assert!(!is_retryable(401));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_recovers() {
        let calls = AtomicU32::new(0);
        let result = with_retry("flaky", 3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(AttemptError::new(503, "busy"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_gives_up_on_client_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry("bad", 5, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AttemptError::new(400, "bad request")) }
        })
        .await;

        assert_eq!(result.unwrap_err().status, 400);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_stops_at_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry("down", 3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AttemptError::new(502, "")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
