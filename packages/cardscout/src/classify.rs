//! URL-based service classification.
//!
//! An explicit category on the target config always wins. Otherwise the
//! URL's host and path tokens are checked against an ordered rule table;
//! the first rule with a matching keyword decides. No match degrades to
//! [`ServiceCategory::Unknown`], which relaxes required-field validation
//! instead of failing the run.

use tracing::debug;
use url::Url;

use crate::schema::ServiceCategory;
use crate::types::config::TargetConfig;

/// One entry in the classification table.
#[derive(Debug, Clone)]
pub struct ClassifyRule {
    /// Substrings matched against lowercased host + path tokens
    pub keywords: Vec<String>,
    pub category: ServiceCategory,
}

impl ClassifyRule {
    pub fn new(category: ServiceCategory, keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            category,
        }
    }
}

/// Ordered, extensible keyword table. Earlier rules win.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<ClassifyRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Classifier {
    /// Table covering the Nordic comparison sites this started from plus
    /// generic English tokens.
    pub fn builtin() -> Self {
        Self {
            rules: vec![
                ClassifyRule::new(
                    ServiceCategory::Electricity,
                    &["electric", "strom", "strøm", "kwh", "energi", "power"],
                ),
                ClassifyRule::new(
                    ServiceCategory::Mobile,
                    &[
                        "mobil", "mobile", "abonnement", "telia", "telenor", "mycall", "ice.",
                        "plan",
                    ],
                ),
                ClassifyRule::new(
                    ServiceCategory::Bank,
                    &["bank", "loan", "lån", "finans", "credit", "kredit"],
                ),
                ClassifyRule::new(
                    ServiceCategory::Business,
                    &["yellowpages", "gulesider", "business", "directory", "bedrift"],
                ),
            ],
        }
    }

    /// Append a rule. Later rules only apply when no earlier rule matched.
    pub fn with_rule(mut self, rule: ClassifyRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Classify a target. See module docs for precedence.
    pub fn classify(&self, config: &TargetConfig) -> ServiceCategory {
        if let Some(category) = config.service_category {
            return category;
        }

        let haystack = match Url::parse(&config.url) {
            Ok(url) => format!(
                "{} {}",
                url.host_str().unwrap_or_default(),
                url.path()
            )
            .to_lowercase(),
            // Unparseable URL: match against the raw string rather than bail
            Err(_) => config.url.to_lowercase(),
        };

        for rule in &self.rules {
            if rule.keywords.iter().any(|k| haystack.contains(k.as_str())) {
                debug!(target = %config.name, category = %rule.category, "classified by URL keywords");
                return rule.category;
            }
        }

        debug!(target = %config.name, "no classification rule matched, using unknown");
        ServiceCategory::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_category_always_wins() {
        let classifier = Classifier::builtin();
        // URL says mobile, config says bank
        let config = TargetConfig::new("x", "https://www.telia.no/privat/mobil/abonnement")
            .with_category(ServiceCategory::Bank);
        assert_eq!(classifier.classify(&config), ServiceCategory::Bank);
    }

    #[test]
    fn url_keywords_decide_in_table_order() {
        let classifier = Classifier::builtin();

        let mobile = TargetConfig::new("t", "https://www.telenor.no/privat/mobil/abonnement");
        assert_eq!(classifier.classify(&mobile), ServiceCategory::Mobile);

        let bank = TargetConfig::new("b", "https://www.norskbank.no/loan/offers");
        assert_eq!(classifier.classify(&bank), ServiceCategory::Bank);

        let electricity = TargetConfig::new("e", "https://www.billigstrom.no/kwh-priser");
        assert_eq!(classifier.classify(&electricity), ServiceCategory::Electricity);
    }

    #[test]
    fn no_match_degrades_to_unknown() {
        let classifier = Classifier::builtin();
        let config = TargetConfig::new("misc", "https://example.com/things");
        assert_eq!(classifier.classify(&config), ServiceCategory::Unknown);
    }

    #[test]
    fn custom_rules_extend_the_table() {
        let classifier = Classifier::builtin().with_rule(ClassifyRule::new(
            ServiceCategory::Electricity,
            &["sparkly"],
        ));
        let config = TargetConfig::new("s", "https://sparkly.example.com/offers");
        assert_eq!(classifier.classify(&config), ServiceCategory::Electricity);
    }
}
