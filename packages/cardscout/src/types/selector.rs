//! Selector candidate types produced by the pattern detector.

use serde::{Deserialize, Serialize};

/// A scored card-container selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorCandidate {
    /// CSS path, e.g. `div.provider-card`
    pub css_path: String,

    /// Elements matched on the page
    pub match_count: usize,

    /// Fraction of matches whose immediate child structure agrees with the
    /// modal structure among all matches (0.0 to 1.0)
    pub consistency_score: f64,

    /// DOM depth of the shallowest match; used for tie-breaking
    pub depth: usize,

    /// How many analyzed sites exposed this selector shape.
    /// Populated only during cross-site aggregation.
    #[serde(default)]
    pub cross_site_occurrences: usize,
}

impl SelectorCandidate {
    pub fn new(css_path: impl Into<String>, match_count: usize, consistency_score: f64) -> Self {
        Self {
            css_path: css_path.into(),
            match_count,
            consistency_score,
            depth: 0,
            cross_site_occurrences: 0,
        }
    }

    /// Set the DOM depth.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Shape of this selector with site-specific class noise removed.
    ///
    /// Class tokens are lowered, split on `-`/`_`, reduced to their last
    /// segment, and segments carrying digits are dropped, so
    /// `.tp-provider-card` and `.card` both normalize to the same shape.
    pub fn normalized_shape(&self) -> String {
        normalize_selector_shape(&self.css_path)
    }
}

/// Normalize a CSS path to a cross-site comparable shape.
pub fn normalize_selector_shape(css_path: &str) -> String {
    let mut tag = String::new();
    let mut classes: Vec<String> = Vec::new();

    for (i, part) in css_path.split('.').enumerate() {
        if i == 0 {
            tag = part.trim().to_ascii_lowercase();
            continue;
        }
        let token = part.trim().to_ascii_lowercase();
        let segment = token
            .rsplit(['-', '_'])
            .next()
            .unwrap_or(&token)
            .to_string();
        if segment.len() < 3 || segment.chars().any(|c| c.is_ascii_digit()) {
            continue;
        }
        if !classes.contains(&segment) {
            classes.push(segment);
        }
    }

    classes.sort();
    if classes.is_empty() {
        tag
    } else {
        format!("{}.{}", tag, classes.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_classes_normalize_to_same_shape() {
        let a = SelectorCandidate::new("div.tp-provider-card", 5, 0.9);
        let b = SelectorCandidate::new("div.card", 4, 0.95);
        assert_eq!(a.normalized_shape(), b.normalized_shape());
        assert_eq!(a.normalized_shape(), "div.card");
    }

    #[test]
    fn hashed_tokens_are_dropped() {
        assert_eq!(normalize_selector_shape("div.css-1x2y3z.plan"), "div.plan");
    }

    #[test]
    fn bare_tag_keeps_tag() {
        assert_eq!(normalize_selector_shape("li"), "li");
    }
}
