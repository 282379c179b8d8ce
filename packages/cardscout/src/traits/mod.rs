//! Trait seams for external collaborators.

pub mod extractor;
pub mod fetcher;

pub use extractor::{parse_field_response, ExtractOutcome, FieldExtractor, RawFields};
pub use fetcher::Fetcher;
