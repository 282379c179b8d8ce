//! Configuration types for targets, detection, extraction, and runs.

use serde::{Deserialize, Serialize};

use crate::schema::ServiceCategory;

/// Declarative configuration for one target site.
///
/// Immutable once loaded for a run. Built from the named operator table,
/// a JSON config file, or CLI-supplied overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetConfig {
    /// Short name used in logs and grouped output (e.g. "telia")
    pub name: String,

    /// Page to fetch
    pub url: String,

    /// Card container selector. When absent the pattern detector picks one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Explicit service category. Overrides URL-based classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_category: Option<ServiceCategory>,

    /// Free-text extraction instruction. When absent a default is derived
    /// from the resolved schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
}

impl TargetConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            selector: None,
            service_category: None,
            instruction: None,
        }
    }

    /// Set a fixed card selector.
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Pin the service category, bypassing URL classification.
    pub fn with_category(mut self, category: ServiceCategory) -> Self {
        self.service_category = Some(category);
        self
    }

    /// Set the extraction instruction.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }
}

/// Tunable thresholds for the pattern detector.
///
/// The defaults match the behavior the heuristics were calibrated against:
/// at least 3 repeated siblings make a candidate, pages over 500KB are
/// flagged oversized, and a body-text density under 5% of markup bytes
/// combined with framework script markers flags JS-rendered content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Minimum number of structurally similar siblings for a candidate.
    pub min_repeat_count: usize,

    /// Raw markup size (bytes) above which a page is flagged oversized.
    pub oversized_page_bytes: usize,

    /// Body-text bytes / markup bytes below which a page counts as
    /// text-sparse for the JS-rendered heuristic.
    pub min_text_density: f64,

    /// Cap on candidates kept per page, best first.
    pub max_candidates: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_repeat_count: 3,
            oversized_page_bytes: 500_000,
            min_text_density: 0.05,
            max_candidates: 10,
        }
    }
}

/// Tunables for the adaptive extraction engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum card fragments extracted per page.
    pub max_fragments: usize,

    /// Detector settings used when no selector is configured.
    pub detector: DetectorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_fragments: 20,
            detector: DetectorConfig::default(),
        }
    }
}

/// Politeness and scheduling settings for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum targets processed concurrently.
    pub concurrency: usize,

    /// Sustained fetch rate per host (requests per second).
    pub requests_per_second: u32,

    /// Fetch attempts before a target is declared failed.
    pub max_fetch_attempts: u32,

    /// Base backoff between attempts, doubled each retry (milliseconds).
    pub backoff_ms: u64,

    /// Engine settings shared by all targets.
    pub engine: EngineConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            requests_per_second: 1,
            max_fetch_attempts: 3,
            backoff_ms: 500,
            engine: EngineConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the global concurrency cap.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the per-host fetch rate.
    pub fn with_requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = rps.max(1);
        self
    }

    /// Set the retry budget.
    pub fn with_max_fetch_attempts(mut self, attempts: u32) -> Self {
        self.max_fetch_attempts = attempts.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_config_builder() {
        let config = TargetConfig::new("telia", "https://www.telia.no/privat/mobil/abonnement")
            .with_selector(".product-card")
            .with_category(ServiceCategory::Mobile)
            .with_instruction("Extract plan name, monthly price and data limit");

        assert_eq!(config.name, "telia");
        assert_eq!(config.selector.as_deref(), Some(".product-card"));
        assert_eq!(config.service_category, Some(ServiceCategory::Mobile));
    }

    #[test]
    fn run_config_floors() {
        let config = RunConfig::new()
            .with_concurrency(0)
            .with_requests_per_second(0)
            .with_max_fetch_attempts(0);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.requests_per_second, 1);
        assert_eq!(config.max_fetch_attempts, 1);
    }

    #[test]
    fn target_config_round_trips() {
        let config = TargetConfig::new("ice", "https://www.ice.no/mobil/abonnement")
            .with_category(ServiceCategory::Mobile);
        let json = serde_json::to_string(&config).unwrap();
        let back: TargetConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
