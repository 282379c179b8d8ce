//! Retry wrapper with exponential backoff.
//!
//! Only transient failures are retried; a 404 or a malformed URL will
//! not improve with patience. See [`FetchError::is_retriable`].
//!
//! [`FetchError::is_retriable`]: crate::error::FetchError::is_retriable

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::FetchResult;
use crate::traits::fetcher::Fetcher;
use crate::types::page::RawPage;

/// A fetcher wrapper that retries transient failures with exponential
/// backoff: `base_backoff * 2^attempt` between attempts.
pub struct RetryingFetcher<F: Fetcher> {
    inner: F,
    max_attempts: u32,
    base_backoff: Duration,
}

impl<F: Fetcher> RetryingFetcher<F> {
    /// Wrap `fetcher` with up to `max_attempts` total attempts (clamped
    /// to at least one) and the given base backoff.
    pub fn new(fetcher: F, max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            inner: fetcher,
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for RetryingFetcher<F> {
    async fn fetch(&self, url: &str) -> FetchResult<RawPage> {
        let mut attempt = 0u32;
        loop {
            match self.inner.fetch(url).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_retriable() && attempt + 1 < self.max_attempts => {
                    let delay = self.base_backoff * 2u32.saturating_pow(attempt);
                    warn!(%url, error = %e, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!(%url, error = %e, attempts = attempt + 1, "fetch failed, giving up");
                    return Err(e);
                }
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
