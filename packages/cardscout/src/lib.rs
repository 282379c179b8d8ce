//! Structured Record Extraction for Listing Pages
//!
//! Scrapes commercial listing pages (mobile plans, electricity deals,
//! bank products) and turns repeated "card" elements into validated,
//! schema-checked records.
//!
//! # Design Philosophy
//!
//! **"Detect structure, extract meaning"**
//!
//! - CSS structure finds the cards; a language model reads them
//! - Schemas validate after extraction, they never constrain the model
//! - Degrade per fragment: one bad card never aborts a page
//! - Degrade per target: one bad site never aborts a run
//! - Site analysis is a pure function of page content
//!
//! # Usage
//!
//! ```rust,ignore
//! use cardscout::{builtin_operators, ChatCompletionExtractor, Orchestrator, RunConfig};
//!
//! let extractor = ChatCompletionExtractor::from_env()?;
//! let orchestrator = Orchestrator::with_http(extractor, RunConfig::default());
//!
//! let outcome = orchestrator.run(&builtin_operators()).await;
//! cardscout::export::write_records("plans.json", &outcome)?;
//! ```
//!
//! # Modules
//!
//! - [`schema`] - Service categories and field schemas
//! - [`classify`] - URL-based service classification
//! - [`detect`] - Repeating-pattern and hazard detection
//! - [`analyze`] - Multi-site structure analysis
//! - [`engine`] - Adaptive per-page extraction
//! - [`orchestrator`] - Multi-target run driver
//! - [`fetchers`] - HTTP fetching with rate limiting and retry
//! - [`extractors`] - LLM-backed field extraction
//! - [`export`] - Grouped JSON export
//! - [`testing`] - Mock implementations for testing

pub mod analyze;
pub mod classify;
pub mod detect;
pub mod engine;
pub mod error;
pub mod export;
pub mod extractors;
pub mod fetchers;
pub mod operators;
pub mod orchestrator;
pub mod schema;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{FetchError, ScrapeError};
pub use traits::{
    extractor::{parse_field_response, ExtractOutcome, FieldExtractor, RawFields},
    fetcher::Fetcher,
};
pub use types::{
    config::{DetectorConfig, EngineConfig, RunConfig, TargetConfig},
    page::{CardFragment, RawPage},
    record::{Confidence, ExtractedRecord, FieldValue},
    report::{AnalysisReport, CookieBannerDetails, Hazard, SiteAnalysis},
    selector::SelectorCandidate,
};

pub use analyze::{recommendations, SiteAnalyzer};
pub use classify::Classifier;
pub use detect::{detect, Detection};
pub use engine::ExtractionEngine;
pub use export::{read_records, read_report, write_records, write_report, RecordsExport, ReportExport};
pub use extractors::ChatCompletionExtractor;
pub use fetchers::{FetcherExt, HttpFetcher, RateLimitedFetcher, RetryingFetcher};
pub use operators::{builtin_operator, builtin_operators, load_targets};
pub use orchestrator::{Orchestrator, RunOutcome, TargetOutcome};
pub use schema::{FieldKind, FieldSchema, FieldSpec, SchemaRegistry, ServiceCategory};

// Re-export testing utilities
pub use testing::{MockExtractor, MockFetcher};
