//! Field extraction via an OpenAI-compatible chat completions endpoint.
//!
//! Works with any provider speaking the chat completions wire format;
//! the default points at DeepSeek, which handles Norwegian listing text
//! well at low cost. Model responses are parsed leniently: fenced or
//! prose-wrapped JSON is accepted, unusable output degrades to
//! `NotExtractable` instead of erroring.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ScrapeError};
use crate::traits::extractor::{parse_field_response, ExtractOutcome, FieldExtractor};

const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";
const DEFAULT_MODEL: &str = "deepseek-chat";
const MAX_FRAGMENT_BYTES: usize = 6000;

const SYSTEM_PROMPT: &str = "You are a data extraction assistant. Extract the requested fields \
from the provided listing text and respond with a single flat JSON object mapping field names \
to string or number values. Only include fields explicitly present in the text. If the text \
contains no extractable offer, respond with exactly NOT_EXTRACTABLE.";

/// Chat-completions-backed field extractor.
#[derive(Clone)]
pub struct ChatCompletionExtractor {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatCompletionExtractor {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into().into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.3,
            max_tokens: 700,
        }
    }

    /// Create from the `DEEPSEEK_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("DEEPSEEK_API_KEY")
            .map_err(|_| ScrapeError::Extractor("DEEPSEEK_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at a different OpenAI-compatible provider.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ScrapeError::Extractor(Box::new(e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ScrapeError::Extractor(
                format!("chat completions error {status}: {error_text}").into(),
            ));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ScrapeError::Extractor(Box::new(e)))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ScrapeError::Extractor("empty chat completions response".into()))
    }
}

#[async_trait]
impl FieldExtractor for ChatCompletionExtractor {
    async fn extract_fields(&self, text: &str, instruction: &str) -> Result<ExtractOutcome> {
        if text.trim().is_empty() {
            return Ok(ExtractOutcome::NotExtractable);
        }

        // Card fragments are short; the cap guards against selector
        // mistakes that slice out half the page
        let user = format!(
            "{instruction}\n\nText:\n{}",
            truncate_to_boundary(text, MAX_FRAGMENT_BYTES)
        );

        let response = self.chat(&user).await?;
        debug!(model = %self.model, response_len = response.len(), "chat extraction response");

        if response.trim().eq_ignore_ascii_case("NOT_EXTRACTABLE") {
            return Ok(ExtractOutcome::NotExtractable);
        }

        Ok(parse_field_response(&response))
    }

    fn name(&self) -> &str {
        "chat-completions"
    }
}

/// Truncate to at most `max_bytes`, backing off to the nearest char
/// boundary so multi-byte text (ø, å, é in Norwegian listings) never
/// gets split mid-character.
fn truncate_to_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let extractor = ChatCompletionExtractor::new("sk-test")
            .with_model("deepseek-reasoner")
            .with_base_url("https://proxy.example/v1")
            .with_temperature(0.0);

        assert_eq!(extractor.model(), "deepseek-reasoner");
        assert_eq!(extractor.base_url, "https://proxy.example/v1");
        assert_eq!(extractor.temperature, 0.0);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 1 + 3000 two-byte chars = 6001 bytes; byte 6000 falls inside
        // the final ø, so the cut backs off to 5999
        let text = format!("a{}", "ø".repeat(3000));
        let truncated = truncate_to_boundary(&text, MAX_FRAGMENT_BYTES);
        assert_eq!(truncated.len(), 5999);
        assert!(truncated.chars().all(|c| c == 'a' || c == 'ø'));

        let short = "Frihet S 199 kr/mnd";
        assert_eq!(truncate_to_boundary(short, MAX_FRAGMENT_BYTES), short);
    }

    #[tokio::test]
    async fn oversized_multibyte_text_reaches_the_request_stage() {
        // Before truncating on a char boundary this sliced mid-ø and
        // panicked; now the request is built and fails on the dead port
        let extractor =
            ChatCompletionExtractor::new("sk-test").with_base_url("http://127.0.0.1:1/v1");
        let text = format!("a{}", "ø".repeat(3000));
        let err = extractor.extract_fields(&text, "extract").await.unwrap_err();
        assert!(matches!(err, ScrapeError::Extractor(_)));
    }

    #[tokio::test]
    async fn empty_text_short_circuits_without_a_request() {
        // base_url is unreachable; a request would error, proving none was made
        let extractor =
            ChatCompletionExtractor::new("sk-test").with_base_url("http://127.0.0.1:1/v1");
        let outcome = extractor.extract_fields("   ", "extract").await.unwrap();
        assert_eq!(outcome, ExtractOutcome::NotExtractable);
    }
}
