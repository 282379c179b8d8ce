//! Validated extraction output types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::schema::ServiceCategory;

/// Whether a record satisfied all required schema fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Every required field present and type-conformant
    Full,
    /// At least one required field missing or uncoercible
    Partial,
}

/// A typed field value. Tagged so exports round-trip losslessly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldValue {
    Text { value: String },
    Number { value: f64 },
    Currency { amount: f64, unit: String },
    Duration { months: u32 },
    Url { value: String },
    Phone { value: String },
}

impl FieldValue {
    /// Plain-text rendering for summaries and logs.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Text { value } => value.clone(),
            FieldValue::Number { value } => format!("{value}"),
            FieldValue::Currency { amount, unit } => format!("{amount} {unit}"),
            FieldValue::Duration { months } => format!("{months} mo"),
            FieldValue::Url { value } => value.clone(),
            FieldValue::Phone { value } => value.clone(),
        }
    }
}

/// One validated record extracted from a card fragment.
///
/// Immutable after validation; field order follows the schema, with any
/// extra extractor-supplied keys appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Page the record came from
    pub source_url: String,

    /// Category the schema was resolved for
    pub service_category: ServiceCategory,

    /// Field name → typed value
    pub fields: IndexMap<String, FieldValue>,

    /// Full when all required fields validated, partial otherwise
    pub confidence: Confidence,

    /// Structural locator of the source fragment, for debugging and dedup
    pub fragment_path: String,
}

impl ExtractedRecord {
    /// An empty partial record for a fragment the extractor could not handle.
    pub fn empty_partial(
        source_url: impl Into<String>,
        category: ServiceCategory,
        fragment_path: impl Into<String>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            service_category: category,
            fields: IndexMap::new(),
            confidence: Confidence::Partial,
            fragment_path: fragment_path.into(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.confidence == Confidence::Full
    }

    /// Fetch a field value by name.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}
