//! Field extractor implementations.

pub mod chat;

pub use chat::ChatCompletionExtractor;
