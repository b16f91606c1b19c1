//! Retry policy for discovery requests.
//!
//! Only transient failures (timeouts, connection errors, 5xx, 429) are
//! retried. Auth and session errors go back to the caller, which owns the
//! re-login path. A 429 that names a `Retry-After` delay is honoured as given
//! instead of using the exponential schedule.

use std::future::Future;
use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};

use crate::error::DiscoveryError;

const MAX_DELAY: Duration = Duration::from_secs(30);

/// Turn a 429 into [`DiscoveryError::RateLimited`], keeping the server's
/// `Retry-After` hint (delta-seconds form only).
pub(crate) fn check_rate_limit(response: Response) -> Result<Response, DiscoveryError> {
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return Ok(response);
    }
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    Err(DiscoveryError::RateLimited { retry_after })
}

pub(crate) fn is_retriable(err: &DiscoveryError) -> bool {
    match err {
        DiscoveryError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        DiscoveryError::RateLimited { .. } => true,
        DiscoveryError::Auth(_)
        | DiscoveryError::SessionExpired { .. }
        | DiscoveryError::SessionStore { .. }
        | DiscoveryError::Deserialize { .. } => false,
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    max_retries: u32,
    base: Duration,
}

impl RetryPolicy {
    pub(crate) fn new(max_retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            max_retries,
            base: Duration::from_millis(backoff_base_ms),
        }
    }

    /// Delay before retry number `attempt` (1-based). A server hint wins,
    /// otherwise the base doubles per attempt with ±25 % jitter. Both are
    /// capped at [`MAX_DELAY`].
    pub(crate) fn delay_for(&self, attempt: u32, err: &DiscoveryError) -> Duration {
        if let DiscoveryError::RateLimited {
            retry_after: Some(hint),
        } = err
        {
            return (*hint).min(MAX_DELAY);
        }
        let doubled = self.base.saturating_mul(1u32 << attempt.saturating_sub(1).min(10));
        doubled
            .min(MAX_DELAY)
            .mul_f64(rand::random::<f64>() * 0.5 + 0.75)
    }

    /// Run `operation`, retrying transient failures up to `max_retries`
    /// extra times.
    pub(crate) async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, DiscoveryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DiscoveryError>>,
    {
        let mut attempt = 0u32;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !is_retriable(&err) || attempt >= self.max_retries {
                return Err(err);
            }
            attempt += 1;
            let delay = self.delay_for(attempt, &err);
            tracing::warn!(
                attempt,
                max_retries = self.max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "discovery: transient error, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
