//! Generative provider abstraction, the Gemini implementation, and
//! prompt construction.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::http::post_json_with_retry;

/// Produces a natural-language completion for a fully assembled prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Build the prompt handed to the generative model.
///
/// When `context` is empty the context section is omitted entirely and
/// the model is told no supporting material was found, so it can answer
/// honestly instead of hallucinating sources.
pub fn build_prompt(question: &str, context: &str) -> String {
    if context.trim().is_empty() {
        return format!(
            "You are an assistant that answers questions about an organization's \
             internal documents.\n\
             No relevant document excerpts were found for this question. Say that \
             you could not find relevant information in the available documents and \
             suggest rephrasing the question.\n\n\
             Question: {question}\n\nAnswer:"
        );
    }

    format!(
        "You are an assistant that answers questions about an organization's \
         internal documents.\n\
         Answer using only the document excerpts below. If the excerpts do not \
         contain the answer, say so plainly. Do not invent information.\n\n\
         Document excerpts:\n{context}\n\
         Question: {question}\n\nAnswer:"
    )
}

/// Gemini `generateContent` client.
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
    temperature: f64,
    max_output_tokens: u32,
    max_retries: u32,
}

impl GeminiGenerator {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| Error::GenerationProvider("GEMINI_API_KEY not set".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::GenerationProvider(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.chat_model.clone(),
            api_key,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, self.model, self.api_key
        );
        let body = serde_json::json!({
            "contents": [ { "parts": [ { "text": prompt } ] } ],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
            }
        });

        let json = post_json_with_retry(
            &self.client,
            &url,
            &reqwest::header::HeaderMap::new(),
            &body,
            self.max_retries,
        )
        .await
        .map_err(Error::GenerationProvider)?;

        parse_completion(&json)
    }
}

/// Extract `candidates[0].content.parts[*].text` from a `generateContent`
/// response. A blank completion is treated as a provider failure.
fn parse_completion(json: &serde_json::Value) -> Result<String> {
    let parts = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| {
            Error::GenerationProvider("response missing candidates[0].content.parts".to_string())
        })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join("");

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(Error::GenerationProvider(
            "provider returned a blank completion".to_string(),
        ));
    }
    Ok(text)
}
