//! Transient-error classification and exponential backoff retry.
//!
//! HC and ABS calls already retry 429s internally against their own rate
//! limiter; this layer catches everything else transient (connection
//! resets, 5xx, timeouts) that slips past an adapter and would otherwise
//! fail a single book's sync outright.

use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

/// Maximum number of retries for transient errors.
const MAX_RETRIES: u32 = 5;

/// Base delay for exponential backoff (1 second).
const BASE_DELAY_SECS: u64 = 1;

/// Determines whether an error is transient (retryable).
///
/// Transient errors include network errors (connection refused, timeout,
/// DNS), rate limiting (HTTP 429), and server errors (HTTP 5xx).
pub fn is_transient_error(err: &anyhow::Error) -> bool {
    let err_str = format!("{err:#}").to_lowercase();

    if err_str.contains("network")
        || err_str.contains("connection")
        || err_str.contains("timeout")
        || err_str.contains("dns")
        || err_str.contains("reset by peer")
        || err_str.contains("broken pipe")
    {
        return true;
    }

    if err_str.contains("429") || err_str.contains("too many requests") || err_str.contains("rate limit") {
        return true;
    }

    if err_str.contains("500")
        || err_str.contains("502")
        || err_str.contains("503")
        || err_str.contains("504")
        || err_str.contains("server error")
    {
        return true;
    }

    false
}

/// Executes an async operation with exponential backoff retry.
///
/// Only retries on transient errors; everything else is returned
/// immediately. Backoff schedule: 1s, 2s, 4s, 8s, 16s.
pub async fn with_retry<F, Fut, T>(operation_name: &str, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut last_error: Option<anyhow::Error> = None;

    for attempt in 0..=MAX_RETRIES {
        match f().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(operation = operation_name, attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if attempt < MAX_RETRIES && is_transient_error(&err) {
                    let delay_secs = BASE_DELAY_SECS * 2u64.pow(attempt);
                    warn!(
                        operation = operation_name,
                        attempt,
                        delay_secs,
                        error = %err,
                        "transient error, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                    last_error = Some(err);
                } else {
                    return Err(err);
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("retry exhausted for {operation_name}")))
}
