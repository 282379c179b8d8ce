//! Adaptive extraction engine: slices a page into card fragments and
//! turns each fragment into a validated record.
//!
//! Selector resolution prefers an explicit config selector, then falls
//! back to pattern detection; when neither yields anything the target
//! fails with `NoPatternFound` rather than guessing. Per-fragment
//! extractor failures degrade that fragment to an empty partial record —
//! one bad card never aborts the page.

use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::classify::Classifier;
use crate::detect::{self, collapse_whitespace};
use crate::error::{Result, ScrapeError};
use crate::schema::{FieldSchema, SchemaRegistry, ServiceCategory};
use crate::traits::extractor::{ExtractOutcome, FieldExtractor};
use crate::types::config::{EngineConfig, TargetConfig};
use crate::types::page::{CardFragment, RawPage};
use crate::types::record::{Confidence, ExtractedRecord};

/// Extraction pipeline for one page. Generic over the extraction
/// capability so tests can swap in a mock.
pub struct ExtractionEngine<X> {
    classifier: Classifier,
    registry: SchemaRegistry,
    config: EngineConfig,
    extractor: X,
}

impl<X: FieldExtractor> ExtractionEngine<X> {
    pub fn new(extractor: X) -> Self {
        Self {
            classifier: Classifier::builtin(),
            registry: SchemaRegistry::builtin(),
            config: EngineConfig::default(),
            extractor,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_registry(mut self, registry: SchemaRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Extract validated records from a fetched page.
    ///
    /// Zero fragments is an empty success: a page legitimately carrying
    /// no current offers is not an error. Fragments without visible text
    /// are dropped before the extractor sees them.
    pub async fn extract(
        &self,
        target: &TargetConfig,
        page: &RawPage,
    ) -> Result<Vec<ExtractedRecord>> {
        let category = self.classifier.classify(target);
        let schema = self.registry.schema_for(category);

        let selector = self.resolve_selector(target, page)?;
        debug!(target = %target.name, %category, selector = %selector, "extracting");

        let mut fragments = slice_fragments(page, &selector, self.config.max_fragments)?;
        fragments.retain(CardFragment::has_text);

        // Configured selectors go stale when sites redesign; fall back to
        // pattern detection before concluding the page is empty
        if fragments.is_empty() && target.selector.is_some() {
            if let Some(detected) = detect::detect(page, None, &self.config.detector)
                .primary_selector
                .map(|c| c.css_path)
            {
                debug!(target = %target.name, fallback = %detected, "configured selector matched nothing, using detected pattern");
                fragments = slice_fragments(page, &detected, self.config.max_fragments)?;
                fragments.retain(CardFragment::has_text);
            }
        }

        if fragments.is_empty() {
            debug!(target = %target.name, "selector matched no fragments");
            return Ok(Vec::new());
        }

        let instruction = target
            .instruction
            .clone()
            .unwrap_or_else(|| schema.default_instruction());

        let mut records = Vec::with_capacity(fragments.len());
        for fragment in &fragments {
            records.push(
                self.extract_fragment(page, category, &schema, fragment, &instruction)
                    .await,
            );
        }

        Ok(records)
    }

    /// Explicit selector wins; otherwise the detector's best candidate.
    fn resolve_selector(&self, target: &TargetConfig, page: &RawPage) -> Result<String> {
        if let Some(selector) = &target.selector {
            return Ok(selector.clone());
        }

        let detection = detect::detect(page, None, &self.config.detector);
        detection
            .primary_selector
            .map(|c| c.css_path)
            .ok_or_else(|| ScrapeError::NoPatternFound {
                url: page.url.clone(),
            })
    }

    async fn extract_fragment(
        &self,
        page: &RawPage,
        category: ServiceCategory,
        schema: &FieldSchema,
        fragment: &CardFragment,
        instruction: &str,
    ) -> ExtractedRecord {
        let outcome = self
            .extractor
            .extract_fields(&fragment.text_content, instruction)
            .await;

        let raw = match outcome {
            Ok(ExtractOutcome::Fields(fields)) => fields,
            Ok(ExtractOutcome::NotExtractable) => {
                debug!(fragment = %fragment.container_path, "extractor declined fragment");
                return ExtractedRecord::empty_partial(&page.url, category, &fragment.container_path);
            }
            Err(e) => {
                warn!(fragment = %fragment.container_path, error = %e, "extractor failed, degrading to partial");
                return ExtractedRecord::empty_partial(&page.url, category, &fragment.container_path);
            }
        };

        let (fields, all_required_ok) = schema.validate(&raw);

        ExtractedRecord {
            source_url: page.url.clone(),
            service_category: category,
            fields,
            confidence: if all_required_ok {
                Confidence::Full
            } else {
                Confidence::Partial
            },
            fragment_path: fragment.container_path.clone(),
        }
    }
}

/// Slice a page into card fragments at every selector match, in document
/// order, up to `max_fragments`.
pub fn slice_fragments(
    page: &RawPage,
    css_path: &str,
    max_fragments: usize,
) -> Result<Vec<CardFragment>> {
    let selector = Selector::parse(css_path).map_err(|_| ScrapeError::InvalidSelector {
        selector: css_path.to_string(),
    })?;

    let document = Html::parse_document(&page.html);

    Ok(document
        .select(&selector)
        .take(max_fragments)
        .map(|el| {
            CardFragment::new(
                detect::element_path(&el),
                collapse_whitespace(&el.text().collect::<String>()),
                el.html(),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ServiceCategory;
    use crate::testing::MockExtractor;
    use serde_json::json;

    fn mobile_page(cards: &[&str]) -> RawPage {
        let body: String = cards
            .iter()
            .map(|c| format!("<div class=\"plan-card\">{c}</div>"))
            .collect();
        RawPage::new(
            "https://www.telia.no/privat/mobil/abonnement",
            format!("<html><body><main>{body}</main></body></html>"),
        )
    }

    fn target() -> TargetConfig {
        TargetConfig::new("telia", "https://www.telia.no/privat/mobil/abonnement")
            .with_selector(".plan-card")
    }

    #[tokio::test]
    async fn fragments_become_records_in_document_order() {
        let extractor = MockExtractor::new()
            .with_fields_for("Frihet S", json!({"name": "Frihet S", "monthly_price": "199 kr"}))
            .with_fields_for("Frihet M", json!({"name": "Frihet M", "monthly_price": "299 kr"}));

        let engine = ExtractionEngine::new(extractor);
        let page = mobile_page(&["Frihet S 199 kr", "Frihet M 299 kr"]);

        let records = engine.extract(&target(), &page).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].field("name").unwrap().display(),
            "Frihet S".to_string()
        );
        assert_eq!(records[1].field("name").unwrap().display(), "Frihet M");
        assert!(records.iter().all(|r| r.is_full()));
    }

    #[tokio::test]
    async fn zero_fragments_is_an_empty_success() {
        let engine = ExtractionEngine::new(MockExtractor::new());
        let page = mobile_page(&[]);
        let records = engine.extract(&target(), &page).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn missing_selector_and_pattern_fails_with_no_pattern_found() {
        let engine = ExtractionEngine::new(MockExtractor::new());
        let page = RawPage::new(
            "https://www.telia.no/privat/mobil",
            "<html><body><p>nothing repeated</p></body></html>",
        );
        let target = TargetConfig::new("telia", "https://www.telia.no/privat/mobil");

        let err = engine.extract(&target, &page).await.unwrap_err();
        assert!(matches!(err, ScrapeError::NoPatternFound { .. }));
    }

    #[tokio::test]
    async fn textless_fragments_are_skipped_before_extraction() {
        let extractor = MockExtractor::new()
            .with_default_fields(json!({"name": "n", "monthly_price": "99 kr"}));
        let engine = ExtractionEngine::new(extractor);

        // Middle card is a decorative spacer with no visible text
        let page = RawPage::new(
            "https://www.telia.no/privat/mobil/abonnement",
            "<html><body>\
             <div class=\"plan-card\">Frihet S</div>\
             <div class=\"plan-card\">   </div>\
             <div class=\"plan-card\">Frihet M</div>\
             </body></html>",
        );

        let records = engine.extract(&target(), &page).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn stale_configured_selector_falls_back_to_detection() {
        let extractor =
            MockExtractor::new().with_default_fields(json!({"name": "X", "monthly_price": 99}));
        let engine = ExtractionEngine::new(extractor);

        // Selector from an old site layout matches nothing; the page still
        // carries a detectable card grid
        let target = TargetConfig::new("telia", "https://www.telia.no/privat/mobil/abonnement")
            .with_selector(".legacy-subscription-box");

        let records = engine
            .extract(&target, &mobile_page(&["a", "b", "c"]))
            .await
            .unwrap();
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn detector_supplies_selector_when_config_has_none() {
        let extractor =
            MockExtractor::new().with_default_fields(json!({"name": "X", "monthly_price": 99}));
        let engine = ExtractionEngine::new(extractor);

        let page = mobile_page(&["a", "b", "c"]);
        let target = TargetConfig::new("telia", "https://www.telia.no/privat/mobil/abonnement");

        let records = engine.extract(&target, &page).await.unwrap();
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn missing_required_field_downgrades_confidence() {
        // Schema requires name, monthly_price; extractor omits the price
        let extractor = MockExtractor::new().with_default_fields(json!({"name": "Acme"}));
        let engine = ExtractionEngine::new(extractor);

        let records = engine
            .extract(&target(), &mobile_page(&["Acme"]))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].confidence, Confidence::Partial);
        assert!(records[0].field("monthly_price").is_none());
    }

    #[tokio::test]
    async fn extractor_error_degrades_fragment_to_empty_partial() {
        let extractor = MockExtractor::new().failing();
        let engine = ExtractionEngine::new(extractor);

        let records = engine
            .extract(&target(), &mobile_page(&["one", "two"]))
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.fields.is_empty()));
        assert!(records
            .iter()
            .all(|r| r.confidence == Confidence::Partial));
    }

    #[tokio::test]
    async fn unknown_category_relaxes_validation() {
        let extractor = MockExtractor::new().with_default_fields(json!({"anything": "goes"}));
        let engine = ExtractionEngine::new(extractor);

        let page = RawPage::new(
            "https://example.com/misc",
            "<html><body><div class=\"item\">a</div><div class=\"item\">b</div><div class=\"item\">c</div></body></html>",
        );
        let target = TargetConfig::new("misc", "https://example.com/misc").with_selector(".item");

        let records = engine.extract(&target, &page).await.unwrap();
        assert_eq!(records[0].service_category, ServiceCategory::Unknown);
        assert!(records.iter().all(|r| r.is_full()));
        assert_eq!(records[0].field("anything").unwrap().display(), "goes");
    }

    #[tokio::test]
    async fn fragment_cap_limits_records() {
        let config = EngineConfig {
            max_fragments: 2,
            ..EngineConfig::default()
        };
        let extractor = MockExtractor::new().with_default_fields(json!({"name": "n"}));
        let engine = ExtractionEngine::new(extractor).with_config(config);

        let records = engine
            .extract(&target(), &mobile_page(&["a", "b", "c", "d"]))
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn invalid_explicit_selector_errors() {
        let page = mobile_page(&["a"]);
        let err = slice_fragments(&page, "div..", 10).unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidSelector { .. }));
    }
}
