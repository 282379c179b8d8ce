//! Typed errors for the extraction library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Per-fragment and per-target
//! failures are contained close to where they happen; only selector
//! resolution failure aborts a single target's extraction.

use thiserror::Error;

/// Errors that can occur during scraping and extraction operations.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Page fetch failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// No repeated card structure found and no selector was supplied
    #[error("no card pattern found on {url}; supply a selector hint")]
    NoPatternFound { url: String },

    /// Supplied or detected selector is not valid CSS
    #[error("invalid selector: {selector}")]
    InvalidSelector { selector: String },

    /// Extraction capability errored or returned unusable output
    #[error("extractor error: {0}")]
    Extractor(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Report or record export failed (I/O)
    #[error("export failed: {0}")]
    Export(#[from] std::io::Error),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unknown named operator config
    #[error("unknown operator: {name}")]
    UnknownOperator { name: String },
}

/// Errors that can occur while fetching a page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Non-2xx HTTP response
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Request timed out
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// Transport-level failure (DNS, connect, TLS, body read)
    #[error("network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// URL could not be parsed
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

impl FetchError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Timeouts, transport failures, and 5xx responses are transient;
    /// client errors (4xx) and malformed URLs are not.
    pub fn is_retriable(&self) -> bool {
        match self {
            FetchError::Timeout { .. } | FetchError::Network { .. } => true,
            FetchError::Status { status, .. } => *status >= 500,
            FetchError::InvalidUrl { .. } => false,
        }
    }
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retriable() {
        let err = FetchError::Status {
            status: 503,
            url: "https://example.com".into(),
        };
        assert!(err.is_retriable());
    }

    #[test]
    fn client_errors_are_not_retriable() {
        let err = FetchError::Status {
            status: 404,
            url: "https://example.com".into(),
        };
        assert!(!err.is_retriable());

        let err = FetchError::InvalidUrl {
            url: "not a url".into(),
        };
        assert!(!err.is_retriable());
    }

    #[test]
    fn timeouts_are_retriable() {
        let err = FetchError::Timeout {
            url: "https://example.com".into(),
        };
        assert!(err.is_retriable());
    }
}
