//! Bounded retries with exponential backoff and a per-attempt timeout.

use std::time::Duration;

use reqwest::{Request, Response, StatusCode};
use tracing::{debug, warn};

use super::client::HttpClient;

/// Retry policy for [`fetch_with_retry`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    /// Attempts after the first one.
    pub retries: u32,
    /// Sleep before the second attempt; doubles for every attempt after that.
    pub initial_delay: Duration,
    /// Upper bound on a single attempt, response headers included.
    pub timeout: Duration,
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            retries: 3,
            initial_delay: Duration::from_millis(1_000),
            timeout: Duration::from_millis(30_000),
            retryable_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryOptions {
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Sleep before the 1-based `attempt`. The first attempt never waits.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 2);
        self.initial_delay.saturating_mul(factor)
    }

    fn is_retryable(&self, status: StatusCode) -> bool {
        self.retryable_statuses.contains(&status.as_u16())
    }
}

/// Why a fetch gave up.
#[derive(Debug, thiserror::Error)]
pub enum FetchRetryError {
    #[error("all {attempts} attempts failed, last: {last}")]
    Exhausted {
        attempts: u32,
        /// Status of the final attempt, `None` when it failed below HTTP.
        status: Option<u16>,
        last: String,
    },

    #[error("non-retryable HTTP {status} on attempt {attempt}")]
    NonRetryable { status: u16, attempt: u32 },

    #[error("request cannot be sent: {0}")]
    InvalidRequest(String),

    #[error("failed to read response body: {0}")]
    Body(#[from] reqwest::Error),
}

impl FetchRetryError {
    /// Last HTTP status observed, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchRetryError::Exhausted { status, .. } => *status,
            FetchRetryError::NonRetryable { status, .. } => Some(*status),
            FetchRetryError::InvalidRequest(_) => None,
            FetchRetryError::Body(e) => e.status().map(|s| s.as_u16()),
        }
    }

    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            FetchRetryError::Exhausted { attempts, .. } => *attempts,
            FetchRetryError::NonRetryable { attempt, .. } => *attempt,
            FetchRetryError::InvalidRequest(_) => 0,
            FetchRetryError::Body(_) => 1,
        }
    }
}

/// Sends `request` until it succeeds, a non-retryable status comes back, or
/// the attempt budget runs out.
///
/// Transport errors and timeouts count as retryable. A 4xx status outside
/// the retryable set fails at once without consuming further attempts.
///
/// # Errors
///
/// Returns [`FetchRetryError::InvalidRequest`] if the request has a streaming
/// body that cannot be replayed.
pub async fn fetch_with_retry<C: HttpClient + ?Sized>(
    client: &C,
    request: Request,
    options: &RetryOptions,
) -> Result<Response, FetchRetryError> {
    let max_attempts = options.max_attempts();
    let url = request.url().clone();
    let mut last_status = None;
    let mut last = String::from("no attempt made");

    for attempt in 1..=max_attempts {
        let delay = options.backoff(attempt);
        if !delay.is_zero() {
            debug!(%url, attempt, delay_ms = delay.as_millis() as u64, "Backing off before retry");
            tokio::time::sleep(delay).await;
        }

        let req = request
            .try_clone()
            .ok_or_else(|| FetchRetryError::InvalidRequest("streaming body cannot be retried".into()))?;

        match tokio::time::timeout(options.timeout, client.execute(req)).await {
            Ok(Ok(resp)) => {
                let status = resp.status();
                if status.is_success() {
                    return Ok(resp);
                }
                if !options.is_retryable(status) {
                    return Err(FetchRetryError::NonRetryable {
                        status: status.as_u16(),
                        attempt,
                    });
                }
                warn!(%url, attempt, max_attempts, status = status.as_u16(), "Fetch attempt failed");
                last_status = Some(status.as_u16());
                last = format!("HTTP {status}");
            }
            Ok(Err(e)) => {
                warn!(%url, attempt, max_attempts, error = %e, "Fetch attempt failed");
                last_status = None;
                last = e.to_string();
            }
            Err(_) => {
                warn!(%url, attempt, max_attempts, timeout_ms = options.timeout.as_millis() as u64, "Fetch attempt timed out");
                last_status = None;
                last = format!("timed out after {:?}", options.timeout);
            }
        }
    }

    Err(FetchRetryError::Exhausted {
        attempts: max_attempts,
        status: last_status,
        last,
    })
}

#[cfg(test)]
impl RetryOptions {
    /// Same policy with millisecond delays so tests stay quick.
    pub(crate) fn fast() -> Self {
        Self {
            initial_delay: Duration::from_millis(1),
            timeout: Duration::from_millis(200),
            ..Self::default()
        }
    }
}
