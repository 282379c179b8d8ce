//! Per-host rate limiting wrapper using the governor crate.
//!
//! Limits are keyed by host, so a run fanning out across operators never
//! hammers one site while others idle. Requests to distinct hosts
//! proceed independently.

use async_trait::async_trait;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;
use url::Url;

use crate::error::FetchResult;
use crate::traits::fetcher::Fetcher;
use crate::types::page::RawPage;

/// A fetcher wrapper that enforces a per-host request rate.
pub struct RateLimitedFetcher<F: Fetcher> {
    inner: F,
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
}

impl<F: Fetcher> RateLimitedFetcher<F> {
    /// Wrap `fetcher`, allowing at most `requests_per_second` per host.
    /// A zero rate is clamped to one request per second.
    pub fn new(fetcher: F, requests_per_second: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        Self {
            inner: fetcher,
            limiter: Arc::new(RateLimiter::keyed(Quota::per_second(rate))),
        }
    }

    /// Wrap with a custom quota, e.g. to allow bursts.
    pub fn with_quota(fetcher: F, quota: Quota) -> Self {
        Self {
            inner: fetcher,
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }

    fn host_key(url: &str) -> String {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| url.to_string())
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for RateLimitedFetcher<F> {
    async fn fetch(&self, url: &str) -> FetchResult<RawPage> {
        let key = Self::host_key(url);
        self.limiter.until_key_ready(&key).await;
        self.inner.fetch(url).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Extension trait for ergonomic wrapping.
pub trait FetcherExt: Fetcher + Sized {
    /// Wrap this fetcher with a per-host rate limit.
    fn rate_limited(self, requests_per_second: u32) -> RateLimitedFetcher<Self> {
        RateLimitedFetcher::new(self, requests_per_second)
    }
}

impl<F: Fetcher + Sized> FetcherExt for F {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use std::time::Instant;

    #[tokio::test]
    async fn same_host_requests_are_spaced_out() {
        let fetcher = MockFetcher::new()
            .with_page(RawPage::new("https://example.com/1", "a"))
            .with_page(RawPage::new("https://example.com/2", "b"))
            .with_page(RawPage::new("https://example.com/3", "c"))
            .rate_limited(2);

        let start = Instant::now();
        fetcher.fetch("https://example.com/1").await.unwrap();
        fetcher.fetch("https://example.com/2").await.unwrap();
        fetcher.fetch("https://example.com/3").await.unwrap();

        // 3 requests at 2/sec: first immediate, rest wait
        assert!(
            start.elapsed().as_millis() >= 500,
            "rate limiting not applied: {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn distinct_hosts_are_not_coupled() {
        let fetcher = MockFetcher::new()
            .with_page(RawPage::new("https://a.example/x", "a"))
            .with_page(RawPage::new("https://b.example/x", "b"))
            .rate_limited(1);

        let start = Instant::now();
        fetcher.fetch("https://a.example/x").await.unwrap();
        fetcher.fetch("https://b.example/x").await.unwrap();

        assert!(
            start.elapsed().as_millis() < 400,
            "separate hosts should not share a limiter key"
        );
    }

    #[tokio::test]
    async fn zero_rate_is_clamped() {
        let fetcher = MockFetcher::new()
            .with_page(RawPage::new("https://a.example/x", "a"))
            .rate_limited(0);
        assert!(fetcher.fetch("https://a.example/x").await.is_ok());
    }
}
