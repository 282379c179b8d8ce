//! Page and fragment types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fetched page, read-only downstream of the fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawPage {
    /// Final URL (after redirects)
    pub url: String,

    /// Raw HTML markup as returned by the server
    pub html: String,

    /// When the page was fetched
    pub fetched_at: DateTime<Utc>,

    /// HTTP status code
    pub status_code: u16,
}

impl RawPage {
    /// Create a new page with status 200 and the current timestamp.
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            fetched_at: Utc::now(),
            status_code: 200,
        }
    }

    /// Set the HTTP status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = status;
        self
    }

    /// Set the fetched timestamp.
    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    /// Markup length in bytes.
    pub fn content_length(&self) -> usize {
        self.html.len()
    }

    /// The page host, if the URL parses.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
    }
}

/// One card-level sub-region of a page, owned by the extraction engine
/// for the duration of a single extraction call.
#[derive(Debug, Clone, PartialEq)]
pub struct CardFragment {
    /// Structural locator of the container (tag path with positions)
    pub container_path: String,

    /// Whitespace-collapsed visible text of the fragment
    pub text_content: String,

    /// Inner markup of the fragment
    pub html_content: String,
}

impl CardFragment {
    pub fn new(
        container_path: impl Into<String>,
        text_content: impl Into<String>,
        html_content: impl Into<String>,
    ) -> Self {
        Self {
            container_path: container_path.into(),
            text_content: text_content.into(),
            html_content: html_content.into(),
        }
    }

    /// Whether the fragment carries any visible text at all.
    pub fn has_text(&self) -> bool {
        !self.text_content.trim().is_empty()
    }
}
