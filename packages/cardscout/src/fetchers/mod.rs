//! Fetcher implementations and wrappers.

pub mod http;
pub mod rate_limited;
pub mod retrying;

pub use http::HttpFetcher;
pub use rate_limited::{FetcherExt, RateLimitedFetcher};
pub use retrying::RetryingFetcher;
