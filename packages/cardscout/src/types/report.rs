//! Analysis report types.
//!
//! The report is a pure function of the fetched pages: no timestamps or
//! run-specific state live here, so analyzing an unchanged page twice
//! yields an identical report. Export metadata is added at serialization
//! time (see `export`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::selector::SelectorCandidate;

/// A structural condition that degrades extraction reliability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hazard {
    /// Full-viewport consent overlay present
    CookieBanner,
    /// Static markup looks empty while rendering-framework scripts are present
    JsRendered,
    /// Raw markup exceeds the configured size threshold
    OversizedPage,
}

impl std::fmt::Display for Hazard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Hazard::CookieBanner => "cookie_banner",
            Hazard::JsRendered => "js_rendered",
            Hazard::OversizedPage => "oversized_page",
        };
        f.write_str(s)
    }
}

/// What the detector learned about a consent banner, for later dismissal
/// automation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieBannerDetails {
    /// Locator of the banner container
    pub container_path: String,

    /// First stretch of the banner text that matched a consent marker
    pub matched_text: String,

    /// Locators of accept-button candidates inside the banner
    #[serde(default)]
    pub accept_paths: Vec<String>,
}

/// Analysis outcome for one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteAnalysis {
    pub name: String,
    pub url: String,

    /// HTTP status of the fetch, when one happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Raw markup size in bytes
    #[serde(default)]
    pub content_length: usize,

    /// Page `<title>`, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Significant words from the title, for cross-site comparison
    #[serde(default)]
    pub title_keywords: Vec<String>,

    pub hazards: BTreeSet<Hazard>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_banner: Option<CookieBannerDetails>,

    /// Scored container candidates, best first
    pub candidate_selectors: Vec<SelectorCandidate>,

    /// Error marker when the site's fetch or parse failed. A failed site
    /// keeps its entry so multi-site analysis never aborts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SiteAnalysis {
    /// Entry for a site whose fetch failed: hazard-free, candidate-empty,
    /// annotated with the error.
    pub fn failed(name: impl Into<String>, url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            status_code: None,
            content_length: 0,
            title: None,
            title_keywords: Vec::new(),
            hazards: BTreeSet::new(),
            cookie_banner: None,
            candidate_selectors: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregated multi-site analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub per_site: Vec<SiteAnalysis>,

    /// Selector shapes recurring on at least two sites, sorted by
    /// occurrence count then mean consistency
    pub cross_site_universal_selectors: Vec<SelectorCandidate>,
}

impl AnalysisReport {
    pub fn sites_analyzed(&self) -> usize {
        self.per_site.len()
    }

    pub fn sites_succeeded(&self) -> usize {
        self.per_site.iter().filter(|s| s.succeeded()).count()
    }

    pub fn sites_with_hazard(&self, hazard: Hazard) -> usize {
        self.per_site
            .iter()
            .filter(|s| s.hazards.contains(&hazard))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_entry_is_hazard_free_and_candidate_empty() {
        let entry = SiteAnalysis::failed("telia", "https://www.telia.no", "timeout after retries");
        assert!(entry.hazards.is_empty());
        assert!(entry.candidate_selectors.is_empty());
        assert!(!entry.succeeded());
    }

    #[test]
    fn report_round_trips() {
        let report = AnalysisReport {
            per_site: vec![SiteAnalysis::failed("a", "https://a.example", "boom")],
            cross_site_universal_selectors: vec![SelectorCandidate::new("div.card", 5, 0.9)],
        };
        let json = serde_json::to_string_pretty(&report).unwrap();
        let back: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, back);
    }
}
