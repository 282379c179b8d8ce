//! FieldExtractor trait: the language-model boundary.
//!
//! The extraction capability is an opaque, best-effort collaborator:
//! fragment text plus an instruction go in, a loose field map or an
//! explicit "could not extract" signal comes out. Nothing downstream
//! assumes the output is deterministic or schema-conformant; validation
//! happens in the engine.

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::Result;

/// Raw field guesses for one fragment, before validation.
pub type RawFields = IndexMap<String, serde_json::Value>;

/// What the extraction capability produced for a fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractOutcome {
    /// Field-name-like keys mapped to string/number values
    Fields(RawFields),
    /// The capability explicitly declined (empty or unusable fragment)
    NotExtractable,
}

/// Extraction capability: text + instruction → structured guess.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract_fields(&self, text: &str, instruction: &str) -> Result<ExtractOutcome>;

    /// Implementation name for logging.
    fn name(&self) -> &str {
        "extractor"
    }
}

#[async_trait]
impl<X: FieldExtractor + ?Sized> FieldExtractor for std::sync::Arc<X> {
    async fn extract_fields(&self, text: &str, instruction: &str) -> Result<ExtractOutcome> {
        (**self).extract_fields(text, instruction).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Parse a model response into raw fields, tolerating code fences and
/// stray prose around the JSON object.
///
/// Returns `NotExtractable` when no JSON object can be located or the
/// object is empty — malformed output degrades, it never errors.
pub fn parse_field_response(response: &str) -> ExtractOutcome {
    let trimmed = response.trim();

    let json_slice = if let Some(start) = trimmed.find('{') {
        match trimmed.rfind('}') {
            Some(end) if end > start => &trimmed[start..=end],
            _ => return ExtractOutcome::NotExtractable,
        }
    } else {
        return ExtractOutcome::NotExtractable;
    };

    match serde_json::from_str::<RawFields>(json_slice) {
        Ok(fields) if !fields.is_empty() => ExtractOutcome::Fields(fields),
        _ => ExtractOutcome::NotExtractable,
    }
}
