//! Retry utilities for listing and index page fetches.
//!
//! Transport failures (timeouts, refused connections, broken responses) and
//! non-success statuses are retried with a linear backoff whose step depends
//! on the failure class. Anything else is returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Attempt budget and backoff steps for [`retry_with_backoff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay step after a transport failure, multiplied by the attempt number.
    pub transport_step: Duration,
    /// Delay step after a non-success status, multiplied by the attempt number.
    pub status_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            transport_step: Duration::from_millis(800),
            status_step: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget as the default policy, without any sleeping.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            transport_step: Duration::ZERO,
            status_step: Duration::ZERO,
            ..Self::default()
        }
    }

    fn step_for(&self, err: &ScraperError) -> Option<Duration> {
        match err {
            ScraperError::Http(e) if e.status().is_some() => Some(self.status_step),
            ScraperError::Http(e)
                if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() =>
            {
                Some(self.transport_step)
            }
            ScraperError::UnexpectedStatus { .. } => Some(self.status_step),
            _ => None,
        }
    }
}

/// Executes `operation` until it succeeds, fails with a non-retriable error,
/// or the policy's attempt budget is spent. The last error is returned.
///
/// The wait after attempt `n` (1-based) is `step * n`; there is no wait after
/// the final attempt.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let Some(step) = policy.step_for(&err) else {
            return Err(err);
        };
        if attempt >= max_attempts {
            return Err(err);
        }

        let delay = step.saturating_mul(attempt);
        tracing::warn!(
            attempt,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "transient fetch error, retrying"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        attempt += 1;
    }
}
