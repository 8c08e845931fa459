//! Spacing of repeated store API requests.
//!
//! A map view is waiting on every one of these calls, so waits stay short:
//! a server-sent `Retry-After` is honoured up to [`MAX_WAIT`], and without
//! one the wait grows from [`Backoff::base`] with full jitter.

use std::future::Future;
use std::time::Duration;

use crate::error::FetchError;

/// Upper bound on any single wait between attempts.
pub(crate) const MAX_WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Backoff {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    pub base: Duration,
}

impl Backoff {
    /// Wait before retry number `retry` (1-based) after `err`.
    ///
    /// `None` when `err` is not worth another attempt.
    pub(crate) fn wait_after(&self, retry: u32, err: &FetchError) -> Option<Duration> {
        match err {
            FetchError::UnexpectedStatus {
                retry_after: Some(hint),
                status,
                ..
            } if *status == 429 || *status >= 500 => Some((*hint).min(MAX_WAIT)),
            FetchError::UnexpectedStatus { status, .. } if *status >= 500 => {
                Some(self.jittered(retry))
            }
            FetchError::Http(e) if e.is_timeout() || e.is_connect() => Some(self.jittered(retry)),
            _ => None,
        }
    }

    /// Uniform in `0..=min(base * 2^(retry-1), MAX_WAIT)`.
    fn jittered(&self, retry: u32) -> Duration {
        let ceiling = self
            .base
            .saturating_mul(1 << retry.saturating_sub(1).min(16))
            .min(MAX_WAIT);
        let ceiling_ms = u64::try_from(ceiling.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::random_range(0..=ceiling_ms))
    }
}

/// Runs `request` until it succeeds, fails for good, or runs out of retries.
pub(crate) async fn with_retries<T, F, Fut>(
    backoff: Backoff,
    mut request: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut retry = 0u32;
    loop {
        let err = match request().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        retry += 1;
        let wait = match backoff.wait_after(retry, &err) {
            Some(wait) if retry <= backoff.max_retries => wait,
            _ => return Err(err),
        };

        tracing::warn!(
            retry,
            max_retries = backoff.max_retries,
            wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "store API request failed, retrying"
        );
        tokio::time::sleep(wait).await;
    }
}
