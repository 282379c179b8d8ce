//! Fetcher trait: the page-fetch boundary.
//!
//! The pipeline never talks HTTP directly; it asks a `Fetcher` for a
//! [`RawPage`]. Implementations cover plain HTTP, rate limiting, and
//! retrying (see `fetchers`), plus a mock for tests (see `testing`).

use async_trait::async_trait;

use crate::error::FetchResult;
use crate::types::page::RawPage;

/// Fetch capability: URL in, raw markup out.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a single URL.
    ///
    /// A non-2xx response is an error, not a page; redirects are followed
    /// by the implementation.
    async fn fetch(&self, url: &str) -> FetchResult<RawPage>;

    /// Implementation name for logging.
    fn name(&self) -> &str {
        "fetcher"
    }
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for std::sync::Arc<F> {
    async fn fetch(&self, url: &str) -> FetchResult<RawPage> {
        (**self).fetch(url).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
