//! Testing utilities including mock implementations.
//!
//! Useful for exercising the pipeline without real network or LLM calls.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{FetchError, FetchResult, Result, ScrapeError};
use crate::traits::extractor::{ExtractOutcome, FieldExtractor, RawFields};
use crate::traits::fetcher::Fetcher;
use crate::types::page::RawPage;

/// How a mock fetch should fail.
#[derive(Debug, Clone, Copy)]
pub enum MockFailure {
    Timeout,
    Status(u16),
}

enum FailurePlan {
    Always(MockFailure),
    /// Fail this many times, then fall through to the canned page
    Times(u32, MockFailure),
}

/// A mock fetcher serving canned pages, with scriptable failures and
/// call tracking for assertions.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, RawPage>,
    failures: Mutex<HashMap<String, FailurePlan>>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve this page for its URL.
    pub fn with_page(mut self, page: RawPage) -> Self {
        self.pages.insert(page.url.clone(), page);
        self
    }

    /// Always fail this URL.
    pub fn with_failure(self, url: impl Into<String>, failure: MockFailure) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(url.into(), FailurePlan::Always(failure));
        self
    }

    /// Fail this URL `times` times, then serve the canned page.
    pub fn with_transient_failures(
        self,
        url: impl Into<String>,
        times: u32,
        failure: MockFailure,
    ) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(url.into(), FailurePlan::Times(times, failure));
        self
    }

    /// All URLs fetched, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of fetches for one URL.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    fn failure_error(failure: MockFailure, url: &str) -> FetchError {
        match failure {
            MockFailure::Timeout => FetchError::Timeout {
                url: url.to_string(),
            },
            MockFailure::Status(status) => FetchError::Status {
                status,
                url: url.to_string(),
            },
        }
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<RawPage> {
        self.calls.lock().unwrap().push(url.to_string());

        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(url) {
            Some(FailurePlan::Always(failure)) => {
                return Err(Self::failure_error(*failure, url));
            }
            Some(FailurePlan::Times(times, failure)) if *times > 0 => {
                *times -= 1;
                return Err(Self::failure_error(*failure, url));
            }
            _ => {}
        }
        drop(failures);

        self.pages.get(url).cloned().ok_or(FetchError::Status {
            status: 404,
            url: url.to_string(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A mock field extractor with canned responses keyed by fragment text.
#[derive(Default)]
pub struct MockExtractor {
    /// (needle, fields): first needle contained in the fragment text wins
    responses: Vec<(String, RawFields)>,
    default_fields: Option<RawFields>,
    fail: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with these fields when the fragment text contains `needle`.
    pub fn with_fields_for(mut self, needle: impl Into<String>, fields: serde_json::Value) -> Self {
        self.responses.push((needle.into(), to_raw_fields(fields)));
        self
    }

    /// Respond with these fields for any fragment without a needle match.
    pub fn with_default_fields(mut self, fields: serde_json::Value) -> Self {
        self.default_fields = Some(to_raw_fields(fields));
        self
    }

    /// Error on every call.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// All (fragment text, instruction) pairs seen.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FieldExtractor for MockExtractor {
    async fn extract_fields(&self, text: &str, instruction: &str) -> Result<ExtractOutcome> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), instruction.to_string()));

        if self.fail {
            return Err(ScrapeError::Extractor("mock extractor failure".into()));
        }

        for (needle, fields) in &self.responses {
            if text.contains(needle.as_str()) {
                return Ok(ExtractOutcome::Fields(fields.clone()));
            }
        }

        match &self.default_fields {
            Some(fields) => Ok(ExtractOutcome::Fields(fields.clone())),
            None => Ok(ExtractOutcome::NotExtractable),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Convert a JSON object literal into raw extractor fields.
/// Panics on non-objects; mocks are test-only.
pub fn to_raw_fields(value: serde_json::Value) -> RawFields {
    match value {
        serde_json::Value::Object(map) => map.into_iter().collect::<IndexMap<_, _>>(),
        other => panic!("mock fields must be a JSON object, got {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn mock_fetcher_serves_pages_and_tracks_calls() {
        let fetcher = MockFetcher::new().with_page(RawPage::new("https://a.example", "<html></html>"));

        assert!(fetcher.fetch("https://a.example").await.is_ok());
        assert!(fetcher.fetch("https://b.example").await.is_err());
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn transient_failures_recover() {
        let fetcher = MockFetcher::new()
            .with_page(RawPage::new("https://a.example", "<html></html>"))
            .with_transient_failures("https://a.example", 2, MockFailure::Timeout);

        assert!(fetcher.fetch("https://a.example").await.is_err());
        assert!(fetcher.fetch("https://a.example").await.is_err());
        assert!(fetcher.fetch("https://a.example").await.is_ok());
        assert_eq!(fetcher.fetch_count("https://a.example"), 3);
    }

    #[tokio::test]
    async fn mock_extractor_matches_needles_first() {
        let extractor = MockExtractor::new()
            .with_fields_for("special", json!({"name": "special"}))
            .with_default_fields(json!({"name": "default"}));

        let Ok(ExtractOutcome::Fields(fields)) =
            extractor.extract_fields("a special card", "extract").await
        else {
            panic!("expected fields");
        };
        assert_eq!(fields["name"], json!("special"));

        let Ok(ExtractOutcome::Fields(fields)) =
            extractor.extract_fields("another card", "extract").await
        else {
            panic!("expected fields");
        };
        assert_eq!(fields["name"], json!("default"));
    }
}
