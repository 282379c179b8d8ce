//! End-to-end pipeline tests on mock fetchers and extractors.
//!
//! Exercises the full path: fetch, pattern detection, fragment slicing,
//! field extraction, schema validation, aggregation, and export.

use serde_json::json;

use cardscout::testing::{MockExtractor, MockFailure, MockFetcher};
use cardscout::{
    recommendations, Confidence, Hazard, Orchestrator, RawPage, RunConfig, SiteAnalyzer,
    TargetConfig,
};

fn listing_page(url: &str, class: &str, cards: &[&str]) -> RawPage {
    let body: String = cards
        .iter()
        .map(|c| format!("<div class=\"{class}\"><h3>{c}</h3><span class=\"price\">199 kr</span></div>"))
        .collect();
    RawPage::new(
        url,
        format!(
            "<html><head><title>Mobilabonnement</title></head>\
             <body><main>{body}</main></body></html>"
        ),
    )
}

#[tokio::test]
async fn detected_pattern_drives_extraction_without_a_configured_selector() {
    let url = "https://www.telia.no/privat/mobil/abonnement";
    let fetcher = MockFetcher::new().with_page(listing_page(
        url,
        "plan-card",
        &["Smart 5 GB", "Smart 10 GB", "Smart Unlimited"],
    ));
    let extractor = MockExtractor::new()
        .with_fields_for("Smart 5", json!({"name": "Smart 5 GB", "monthly_price": "199 kr"}))
        .with_fields_for("Smart 10", json!({"name": "Smart 10 GB", "monthly_price": "249 kr"}))
        .with_fields_for(
            "Unlimited",
            json!({"name": "Smart Unlimited", "monthly_price": "399 kr"}),
        );

    // No selector configured: the detector must find the repeated cards
    let targets = vec![TargetConfig::new("telia", url)];
    let outcome = Orchestrator::new(fetcher, extractor).run(&targets).await;

    assert!(!outcome.any_failed());
    assert_eq!(outcome.total_records(), 3);
    assert!(outcome.records().all(|r| r.is_full()));
    assert_eq!(
        outcome.outcomes[0].records[0].field("name").unwrap().display(),
        "Smart 5 GB"
    );
}

#[tokio::test]
async fn hazards_surface_in_the_analysis_report() {
    let url = "https://www.telenor.no/privat/mobil/abonnement";
    let html = "<html><head><title>Abonnement</title>\
         <script src=\"/static/js/react.production.min.js\"></script></head>\
         <body>\
         <div class=\"cookie-banner\" style=\"position:fixed\">\
         Vi bruker informasjonskapsler. <button>Godta alle</button></div>\
         <div id=\"root\"></div>\
         </body></html>";
    let fetcher = MockFetcher::new().with_page(RawPage::new(url, html));

    let report = SiteAnalyzer::new(fetcher)
        .analyze(&[TargetConfig::new("telenor", url)])
        .await;

    let site = &report.per_site[0];
    assert!(site.hazards.contains(&Hazard::CookieBanner));
    assert!(site.hazards.contains(&Hazard::JsRendered));
    let banner = site.cookie_banner.as_ref().expect("banner details");
    assert!(!banner.accept_paths.is_empty());

    let hints = recommendations(&report);
    assert!(hints.iter().any(|h| h.contains("cookie banner")));
    assert!(hints.iter().any(|h| h.contains("JavaScript-rendered")));
}

#[tokio::test]
async fn missing_required_fields_downgrade_to_partial_without_failing_the_target() {
    let url = "https://www.ice.no/mobil/abonnement";
    let fetcher = MockFetcher::new().with_page(listing_page(
        url,
        "plan-card",
        &["Ice Basis", "Ice Mer", "Ice Maks"],
    ));
    // Extractor never produces the required monthly_price
    let extractor = MockExtractor::new().with_default_fields(json!({"name": "Ice"}));

    let targets = vec![TargetConfig::new("ice", url).with_selector(".plan-card")];
    let outcome = Orchestrator::new(fetcher, extractor).run(&targets).await;

    assert!(!outcome.any_failed());
    assert_eq!(outcome.total_records(), 3);
    assert!(outcome
        .records()
        .all(|r| r.confidence == Confidence::Partial));
}

#[tokio::test]
async fn failed_target_is_reported_while_others_complete() {
    let telia = "https://www.telia.no/privat/mobil/abonnement";
    let ice = "https://www.ice.no/mobil/abonnement";

    let fetcher = MockFetcher::new()
        .with_page(listing_page(telia, "plan-card", &["Smart 5 GB", "Smart 10 GB"]))
        .with_failure(ice, MockFailure::Status(503));
    let extractor =
        MockExtractor::new().with_default_fields(json!({"name": "Smart", "monthly_price": 199}));

    let targets = vec![
        TargetConfig::new("telia", telia).with_selector(".plan-card"),
        TargetConfig::new("ice", ice).with_selector(".plan-card"),
    ];
    let outcome = Orchestrator::new(fetcher, extractor)
        .with_config(RunConfig::default().with_concurrency(2))
        .run(&targets)
        .await;

    assert!(outcome.any_failed());
    assert_eq!(outcome.outcomes[0].records.len(), 2);
    assert!(outcome.outcomes[1].failed());

    // Grouped export keeps the failed target visible alongside results
    let export = cardscout::RecordsExport::from_outcome(&outcome);
    assert_eq!(export.metadata.total_records, 2);
    assert!(export.groups["ice"].error.is_some());
    assert_eq!(export.groups["telia"].count, 2);
}

#[tokio::test]
async fn equivalent_selector_shapes_are_recognized_across_sites() {
    let alpha = "https://alpha.example/mobil";
    let beta = "https://beta.example/mobil";

    let fetcher = MockFetcher::new()
        .with_page(listing_page(alpha, "card", &["A1", "A2", "A3", "A4"]))
        .with_page(listing_page(beta, "tp-provider-card", &["B1", "B2", "B3"]));

    let report = SiteAnalyzer::new(fetcher)
        .analyze(&[
            TargetConfig::new("alpha", alpha),
            TargetConfig::new("beta", beta),
        ])
        .await;

    let universal = report
        .cross_site_universal_selectors
        .iter()
        .find(|s| s.css_path == "div.card")
        .expect("card shape shared across both sites");
    assert_eq!(universal.cross_site_occurrences, 2);

    let hints = recommendations(&report);
    assert!(hints.iter().any(|h| h.contains("div.card")));
}

#[tokio::test]
async fn extractor_failures_degrade_per_fragment_not_per_target() {
    let url = "https://www.telia.no/privat/mobil/abonnement";
    let fetcher =
        MockFetcher::new().with_page(listing_page(url, "plan-card", &["One", "Two", "Three"]));
    let extractor = MockExtractor::new().failing();

    let targets = vec![TargetConfig::new("telia", url).with_selector(".plan-card")];
    let outcome = Orchestrator::new(fetcher, extractor).run(&targets).await;

    // The target itself succeeds; each fragment degrades to an empty partial
    assert!(!outcome.any_failed());
    assert_eq!(outcome.total_records(), 3);
    assert!(outcome.records().all(|r| r.fields.is_empty()));
    assert!(outcome
        .records()
        .all(|r| r.confidence == Confidence::Partial));
}
