//! Retrying HTTP fetch layer shared by all collectors.
//!
//! One operation: perform a GET and return the response body, or a
//! classified [`FetchError`]. Transient failures (5xx, transport errors,
//! 429 throttling) are retried with exponential backoff; permanent ones
//! (quota exhaustion, 404, other 4xx) fail immediately so the collector can
//! decide what the sweep should do.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;

/// Per-attempt request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// How much of an error body is carried into error messages.
const BODY_PREFIX_LIMIT: usize = 500;

const DEFAULT_USER_AGENT: &str = concat!("dns-inventory/", env!("CARGO_PKG_VERSION"));

/// Retry and throttling knobs, filled from `RATE_LIMIT_*` environment
/// variables by the server's configuration layer.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Attempt `n > 0` is preceded by a sleep of `backoff_factor^n` seconds.
    pub backoff_factor: f64,
    /// Fixed sleep after a 429 before the next attempt.
    pub sleep_on_429: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_factor: 1.5,
            sleep_on_429: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        Duration::from_secs_f64(self.backoff_factor.max(0.0).powi(exponent))
    }
}

/// HTTP client with retry, backoff, and rate-limit handling.
pub struct FetchClient {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl FetchClient {
    /// Creates a client with the given retry policy and a 60 s per-attempt
    /// timeout.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        // Client::builder() only fails if the TLS backend cannot initialize,
        // which is a fatal configuration error.
        #[allow(clippy::expect_used)]
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client: TLS backend unavailable");
        Self { client, policy }
    }

    /// Performs a GET with retry and returns the response body.
    ///
    /// Default `User-Agent` and `Accept: application/json` headers are set
    /// when the caller did not provide them. Cancellation aborts backoff
    /// sleeps and the retry loop immediately.
    pub async fn get(
        &self,
        url: &str,
        headers: HeaderMap,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        let mut headers = headers;
        headers
            .entry(USER_AGENT)
            .or_insert(HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers
            .entry(ACCEPT)
            .or_insert(HeaderValue::from_static("application/json"));

        let mut last_error: Option<FetchError> = None;

        for attempt in 0..=self.policy.max_retries {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            if attempt > 0 {
                self.sleep_or_cancel(self.policy.backoff_delay(attempt), cancel)
                    .await?;
            }

            log::debug!("[fetch] GET {url} (attempt {}/{})", attempt + 1, self.policy.max_retries + 1);

            let response = match self.client.get(url).headers(headers.clone()).send().await {
                Ok(response) => response,
                Err(e) => {
                    log::warn!("[fetch] GET {url} failed: {e}");
                    last_error = Some(FetchError::Transport(e.to_string()));
                    continue;
                }
            };

            let status = response.status();
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    log::warn!("[fetch] GET {url}: failed to read response: {e}");
                    last_error = Some(FetchError::Transport(format!(
                        "failed to read response: {e}"
                    )));
                    continue;
                }
            };

            // Throttling: sleep the configured penalty, then spend a retry.
            if status == StatusCode::TOO_MANY_REQUESTS || body.contains("TOO_MANY_REQUESTS") {
                log::warn!(
                    "[fetch] GET {url} rate limited, sleeping {}s",
                    self.policy.sleep_on_429.as_secs()
                );
                self.sleep_or_cancel(self.policy.sleep_on_429, cancel)
                    .await?;
                last_error = Some(FetchError::RateLimited);
                continue;
            }

            if body.contains("QUOTA_EXCEEDED") {
                return Err(FetchError::QuotaExceeded);
            }

            if status == StatusCode::NOT_FOUND {
                return Err(FetchError::NotFound);
            }

            if status.is_success() {
                return Ok(body);
            }

            if status.is_client_error() {
                return Err(FetchError::Client {
                    status: status.as_u16(),
                    body: truncate_body(&body, BODY_PREFIX_LIMIT),
                });
            }

            log::warn!("[fetch] GET {url} -> HTTP {status}, retrying");
            last_error = Some(FetchError::Server {
                status: status.as_u16(),
                body: truncate_body(&body, BODY_PREFIX_LIMIT),
            });
        }

        Err(last_error
            .unwrap_or_else(|| FetchError::Transport("retries exhausted without an attempt".to_string())))
    }

    async fn sleep_or_cancel(
        &self,
        duration: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), FetchError> {
        tokio::select! {
            () = cancel.cancelled() => Err(FetchError::Cancelled),
            () = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

/// Truncates `body` to at most `max` bytes, respecting char boundaries.
fn truncate_body(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
