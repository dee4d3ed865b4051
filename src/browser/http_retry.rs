//! Shared HTTP retry wrapper with 429/5xx handling and Retry-After support.
//!
//! Listing requests are idempotent GETs, so transient failures are retried
//! with exponential backoff plus jitter. Any other status is handed back to
//! the caller untouched.

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry behaviour for listing requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpRetryConfig {
    /// Maximum number of retry attempts (default: 3)
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff (default: 1000)
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds (default: 30000)
    pub max_delay_ms: u64,
    /// Backoff multiplier (default: 2.0)
    pub backoff_multiplier: f64,
}

impl Default for HttpRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl HttpRetryConfig {
    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Retry-After in seconds, capped at five minutes. HTTP-date values are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    value
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| Duration::from_secs(secs.min(300)))
}

/// Delay for a given attempt with 10-30% jitter
fn calculate_delay(attempt: u32, config: &HttpRetryConfig) -> Duration {
    let base = config.base_delay_ms as f64 * config.backoff_multiplier.powi(attempt as i32);
    let capped = base.min(config.max_delay_ms as f64);
    let jitter = capped * (0.1 + rand::random::<f64>() * 0.2);
    Duration::from_millis((capped + jitter) as u64)
}

/// GET `url`, retrying on 429/5xx up to `config.max_retries` times.
///
/// Transport errors are not retried; the last response is returned as-is
/// once retries are exhausted.
pub async fn get_with_retry(
    client: &Client,
    url: Url,
    config: &HttpRetryConfig,
) -> Result<Response, reqwest::Error> {
    let mut response = client.get(url.clone()).send().await?;

    for attempt in 0..config.max_retries {
        if !is_retryable_status(response.status().as_u16()) {
            return Ok(response);
        }

        let delay = parse_retry_after(response.headers())
            .unwrap_or_else(|| calculate_delay(attempt, config));

        tracing::debug!(
            "GET {} returned {}. Retry {}/{} after {:?}",
            url.path(), response.status(), attempt + 1, config.max_retries, delay
        );

        tokio::time::sleep(delay).await;
        response = client.get(url.clone()).send().await?;
    }

    Ok(response)
}
