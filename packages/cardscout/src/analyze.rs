//! Site structure analyzer: probes configured sites, aggregates per-site
//! findings, and surfaces selector shapes that recur across sites.
//!
//! One site's fetch failure records an annotated entry and the run moves
//! on; a single bad URL never aborts a multi-site analysis. The report is
//! an append-only aggregate built by a single writer after the concurrent
//! fetch/detect work completes.

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::detect;
use crate::traits::fetcher::Fetcher;
use crate::types::config::{DetectorConfig, TargetConfig};
use crate::types::report::{AnalysisReport, Hazard, SiteAnalysis};
use crate::types::selector::SelectorCandidate;

/// Multi-site structure analyzer. Generic over the fetch capability.
pub struct SiteAnalyzer<F> {
    fetcher: F,
    detector: DetectorConfig,
    concurrency: usize,
}

impl<F: Fetcher> SiteAnalyzer<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            detector: DetectorConfig::default(),
            concurrency: 4,
        }
    }

    pub fn with_detector_config(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Analyze every configured site and aggregate the findings.
    pub async fn analyze(&self, targets: &[TargetConfig]) -> AnalysisReport {
        let per_site: Vec<SiteAnalysis> = stream::iter(targets)
            .map(|target| self.analyze_site(target))
            .buffered(self.concurrency)
            .collect()
            .await;

        let cross_site_universal_selectors = universal_selectors(&per_site);

        info!(
            sites = per_site.len(),
            universal = cross_site_universal_selectors.len(),
            "analysis complete"
        );

        AnalysisReport {
            per_site,
            cross_site_universal_selectors,
        }
    }

    async fn analyze_site(&self, target: &TargetConfig) -> SiteAnalysis {
        let page = match self.fetcher.fetch(&target.url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(site = %target.name, error = %e, "site fetch failed, recording error entry");
                return SiteAnalysis::failed(&target.name, &target.url, e.to_string());
            }
        };

        let detection = detect::detect(&page, target.selector.as_deref(), &self.detector);

        // A hinted selector is surfaced alongside the scanned candidates
        let mut candidates = detection.all_candidates;
        if let Some(primary) = detection.primary_selector {
            if !candidates.iter().any(|c| c.css_path == primary.css_path) {
                candidates.insert(0, primary);
            }
        }

        SiteAnalysis {
            name: target.name.clone(),
            url: target.url.clone(),
            status_code: Some(page.status_code),
            content_length: page.content_length(),
            title_keywords: detection
                .title
                .as_deref()
                .map(title_keywords)
                .unwrap_or_default(),
            title: detection.title,
            hazards: detection.hazards,
            cookie_banner: detection.cookie_banner,
            candidate_selectors: candidates,
            error: None,
        }
    }
}

/// Group candidates across sites by normalized selector shape; keep
/// shapes seen on at least two sites, sorted by occurrence count then
/// mean consistency.
fn universal_selectors(per_site: &[SiteAnalysis]) -> Vec<SelectorCandidate> {
    struct ShapeStats {
        sites: usize,
        total_matches: usize,
        consistency_sum: f64,
        min_depth: usize,
    }

    let mut shapes: HashMap<String, ShapeStats> = HashMap::new();

    for site in per_site.iter().filter(|s| s.succeeded()) {
        // Best candidate per shape per site, so one site can't inflate counts
        let mut best_per_shape: HashMap<String, &SelectorCandidate> = HashMap::new();
        for candidate in &site.candidate_selectors {
            let shape = candidate.normalized_shape();
            let entry = best_per_shape.entry(shape).or_insert(candidate);
            if candidate.consistency_score > entry.consistency_score {
                *entry = candidate;
            }
        }

        for (shape, candidate) in best_per_shape {
            let stats = shapes.entry(shape).or_insert(ShapeStats {
                sites: 0,
                total_matches: 0,
                consistency_sum: 0.0,
                min_depth: usize::MAX,
            });
            stats.sites += 1;
            stats.total_matches += candidate.match_count;
            stats.consistency_sum += candidate.consistency_score;
            stats.min_depth = stats.min_depth.min(candidate.depth);
        }
    }

    let mut universal: Vec<SelectorCandidate> = shapes
        .into_iter()
        .filter(|(_, stats)| stats.sites >= 2)
        .map(|(shape, stats)| SelectorCandidate {
            css_path: shape,
            match_count: stats.total_matches,
            consistency_score: stats.consistency_sum / stats.sites as f64,
            depth: if stats.min_depth == usize::MAX {
                0
            } else {
                stats.min_depth
            },
            cross_site_occurrences: stats.sites,
        })
        .collect();

    universal.sort_by(|a, b| {
        b.cross_site_occurrences
            .cmp(&a.cross_site_occurrences)
            .then_with(|| {
                b.consistency_score
                    .partial_cmp(&a.consistency_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.css_path.cmp(&b.css_path))
    });

    universal
}

/// Significant words from a page title, for cross-site comparison.
fn title_keywords(title: &str) -> Vec<String> {
    let mut keywords = Vec::new();
    for word in title.split(|c: char| !c.is_alphanumeric()) {
        let word = word.to_lowercase();
        if word.len() > 3 && !keywords.contains(&word) {
            keywords.push(word);
        }
        if keywords.len() == 5 {
            break;
        }
    }
    keywords
}

/// Human-readable hints derived from a completed report.
///
/// Pure function over the report: recommendations are derived data,
/// recomputed on demand, never stored.
pub fn recommendations(report: &AnalysisReport) -> Vec<String> {
    let mut out = Vec::new();
    let total = report.sites_analyzed();

    for selector in &report.cross_site_universal_selectors {
        out.push(format!(
            "{} sites share selector shape `{}` (mean consistency {:.2}) — reuse it as a default card selector",
            selector.cross_site_occurrences, selector.css_path, selector.consistency_score
        ));
    }

    let cookie_sites = report.sites_with_hazard(Hazard::CookieBanner);
    if cookie_sites > 0 {
        out.push(format!(
            "cookie banner detected on {cookie_sites}/{total} sites — consider banner dismissal before extraction"
        ));
    }

    for site in &report.per_site {
        if site.hazards.contains(&Hazard::JsRendered) {
            out.push(format!(
                "{} appears JavaScript-rendered — static fetch may miss card content",
                site.name
            ));
        }
        if site.hazards.contains(&Hazard::OversizedPage) {
            out.push(format!(
                "page size exceeds threshold on {} ({} bytes) — pagination likely",
                site.name, site.content_length
            ));
        }
    }

    for site in report.per_site.iter().filter(|s| !s.succeeded()) {
        out.push(format!(
            "{} could not be analyzed: {}",
            site.name,
            site.error.as_deref().unwrap_or("unknown error")
        ));
    }

    // Shared title vocabulary hints at sites in the same vertical
    let mut word_sites: HashMap<&str, Vec<&str>> = HashMap::new();
    for site in &report.per_site {
        for word in &site.title_keywords {
            word_sites.entry(word).or_default().push(&site.name);
        }
    }
    let mut shared: Vec<(&str, Vec<&str>)> = word_sites
        .into_iter()
        .filter(|(_, sites)| sites.len() >= 2)
        .collect();
    shared.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(b.0)));
    for (word, sites) in shared.into_iter().take(3) {
        out.push(format!(
            "title keyword '{}' shared by {}",
            word,
            sites.join(", ")
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockFailure, MockFetcher};
    use crate::types::page::RawPage;

    fn card_site(url: &str, class: &str, count: usize) -> RawPage {
        let cards: String = (0..count)
            .map(|i| format!("<div class=\"{class}\"><h3>Offer {i}</h3><span>{i}9 kr</span></div>"))
            .collect();
        RawPage::new(
            url,
            format!("<html><head><title>Mobilabonnement best i test</title></head><body><main>{cards}</main></body></html>"),
        )
    }

    fn targets() -> Vec<TargetConfig> {
        vec![
            TargetConfig::new("alpha", "https://alpha.example/mobil"),
            TargetConfig::new("beta", "https://beta.example/mobil"),
        ]
    }

    #[tokio::test]
    async fn shared_shape_across_two_sites_becomes_universal() {
        let fetcher = MockFetcher::new()
            .with_page(card_site("https://alpha.example/mobil", "card", 5))
            .with_page(card_site("https://beta.example/mobil", "tp-provider-card", 4));

        let analyzer = SiteAnalyzer::new(fetcher);
        let report = analyzer.analyze(&targets()).await;

        assert_eq!(report.sites_succeeded(), 2);
        let universal = report
            .cross_site_universal_selectors
            .iter()
            .find(|s| s.css_path == "div.card")
            .expect("shared card shape");
        assert_eq!(universal.cross_site_occurrences, 2);
        assert!(universal.consistency_score >= 0.9);
    }

    #[tokio::test]
    async fn failed_site_gets_error_entry_and_run_continues() {
        let fetcher = MockFetcher::new()
            .with_page(card_site("https://alpha.example/mobil", "card", 5))
            .with_failure("https://beta.example/mobil", MockFailure::Timeout);

        let analyzer = SiteAnalyzer::new(fetcher);
        let report = analyzer.analyze(&targets()).await;

        assert_eq!(report.sites_analyzed(), 2);
        assert_eq!(report.sites_succeeded(), 1);

        let failed = &report.per_site[1];
        assert_eq!(failed.name, "beta");
        assert!(failed.error.as_deref().unwrap().contains("timeout"));
        assert!(failed.hazards.is_empty());
        assert!(failed.candidate_selectors.is_empty());
    }

    #[tokio::test]
    async fn analysis_is_idempotent_for_unchanged_pages() {
        let make_analyzer = || {
            SiteAnalyzer::new(
                MockFetcher::new()
                    .with_page(
                        card_site("https://alpha.example/mobil", "card", 5)
                            .with_fetched_at(chrono::DateTime::UNIX_EPOCH),
                    )
                    .with_page(
                        card_site("https://beta.example/mobil", "card", 4)
                            .with_fetched_at(chrono::DateTime::UNIX_EPOCH),
                    ),
            )
        };

        let first = make_analyzer().analyze(&targets()).await;
        let second = make_analyzer().analyze(&targets()).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn recommendations_cover_universal_selectors_and_failures() {
        let fetcher = MockFetcher::new()
            .with_page(card_site("https://alpha.example/mobil", "card", 5))
            .with_failure("https://beta.example/mobil", MockFailure::Status(503));

        let report = SiteAnalyzer::new(fetcher).analyze(&targets()).await;
        let hints = recommendations(&report);

        assert!(hints.iter().any(|h| h.contains("could not be analyzed")));
        // Only one site succeeded, so no universal selector hint
        assert!(!hints.iter().any(|h| h.contains("reuse it as a default")));
    }

    #[test]
    fn title_keywords_skip_short_words() {
        let words = title_keywords("Best i test: Mobilabonnement 2024");
        assert_eq!(words, vec!["best", "test", "mobilabonnement", "2024"]);
    }
}
