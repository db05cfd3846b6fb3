//! Embedding gateway abstraction and the Gemini implementation.
//!
//! The [`Embedder`] trait is the seam between the pipeline and the
//! embedding model. [`GeminiEmbedder`] calls the Gemini `embedContent`
//! endpoint; tests substitute deterministic stubs.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::http::post_json_with_retry;

/// Turns a piece of text into a dense vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Gemini `embedContent` client.
///
/// Requires `GEMINI_API_KEY` in the environment. Transient failures are
/// retried with exponential backoff; see [`crate::http`].
pub struct GeminiEmbedder {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
    max_retries: u32,
}

impl GeminiEmbedder {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| Error::EmbeddingProvider("GEMINI_API_KEY not set".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::EmbeddingProvider(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.embedding_model.clone(),
            api_key,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!(
            "{}/models/{}:embedContent?key={}",
            self.api_base, self.model, self.api_key
        );
        let body = serde_json::json!({
            "content": { "parts": [ { "text": text } ] }
        });

        let json = post_json_with_retry(
            &self.client,
            &url,
            &reqwest::header::HeaderMap::new(),
            &body,
            self.max_retries,
        )
        .await
        .map_err(Error::EmbeddingProvider)?;

        parse_embedding(&json)
    }
}

/// Extract `embedding.values` from an `embedContent` response.
fn parse_embedding(json: &serde_json::Value) -> Result<Vec<f32>> {
    let values = json
        .get("embedding")
        .and_then(|e| e.get("values"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            Error::EmbeddingProvider("response missing embedding.values".to_string())
        })?;

    let vector: Vec<f32> = values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect();

    if vector.is_empty() {
        return Err(Error::EmbeddingProvider(
            "provider returned an empty embedding".to_string(),
        ));
    }

    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_embedding_values() {
        let json = serde_json::json!({
            "embedding": { "values": [0.1, -0.2, 0.3] }
        });
        let v = parse_embedding(&json).unwrap();
        assert_eq!(v.len(), 3);
        assert!((v[1] + 0.2).abs() < 1e-6);
    }

    #[test]
    fn missing_embedding_is_an_error() {
        let json = serde_json::json!({ "error": { "message": "nope" } });
        assert!(matches!(
            parse_embedding(&json),
            Err(Error::EmbeddingProvider(_))
        ));
    }

    #[test]
    fn empty_vector_is_an_error() {
        let json = serde_json::json!({ "embedding": { "values": [] } });
        assert!(matches!(
            parse_embedding(&json),
            Err(Error::EmbeddingProvider(_))
        ));
    }
}
