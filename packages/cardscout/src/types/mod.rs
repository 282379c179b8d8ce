//! Data model shared across the pipeline.

pub mod config;
pub mod page;
pub mod record;
pub mod report;
pub mod selector;

pub use config::{DetectorConfig, EngineConfig, RunConfig, TargetConfig};
pub use page::{CardFragment, RawPage};
pub use record::{Confidence, ExtractedRecord, FieldValue};
pub use report::{AnalysisReport, CookieBannerDetails, Hazard, SiteAnalysis};
pub use selector::{normalize_selector_shape, SelectorCandidate};
