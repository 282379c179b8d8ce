//! Built-in operator targets and config file loading.
//!
//! Ships a table of Norwegian mobile operator listing pages so the CLI
//! works out of the box; additional or replacement targets load from a
//! JSON config file.

use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, ScrapeError};
use crate::schema::ServiceCategory;
use crate::types::config::TargetConfig;

/// The built-in operator targets, in stable order.
///
/// Selectors are fallbacks: pattern detection still runs when they
/// match nothing on a redesigned page.
pub fn builtin_operators() -> Vec<TargetConfig> {
    vec![
        TargetConfig::new("telia", "https://www.telia.no/privat/mobil/abonnement")
            .with_selector(".product-card, .plan-card, [data-testid*=\"plan\"]")
            .with_category(ServiceCategory::Mobile),
        TargetConfig::new("telenor", "https://www.telenor.no/privat/mobil/abonnement")
            .with_selector(".product-card, .plan-item, [data-cy*=\"plan\"]")
            .with_category(ServiceCategory::Mobile),
        TargetConfig::new("ice", "https://www.ice.no/mobil/abonnement")
            .with_selector(".plan-card, .product-item")
            .with_category(ServiceCategory::Mobile),
        TargetConfig::new("mycall", "https://mycall.no")
            .with_selector(".plan-box, .offer-card")
            .with_category(ServiceCategory::Mobile),
    ]
}

/// Look up a built-in operator by name (case-insensitive).
pub fn builtin_operator(name: &str) -> Result<TargetConfig> {
    builtin_operators()
        .into_iter()
        .find(|t| t.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| ScrapeError::UnknownOperator {
            name: name.to_string(),
        })
}

#[derive(Deserialize)]
struct TargetsFile {
    targets: Vec<TargetConfig>,
}

/// Load targets from a JSON config file of the shape
/// `{"targets": [{"name": ..., "url": ..., ...}]}`.
pub fn load_targets(path: impl AsRef<Path>) -> Result<Vec<TargetConfig>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;
    let file: TargetsFile = serde_json::from_str(&raw)?;
    debug!(path = %path.display(), targets = file.targets.len(), "loaded targets from config");
    Ok(file.targets)
}
