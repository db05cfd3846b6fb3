//! Pinecone REST client implementing [`VectorIndex`].
//!
//! Talks to a serverless index over its data-plane host. Requires
//! `PINECONE_API_KEY` in the environment; the host URL comes from the
//! `[index]` config section. All calls share the retry/backoff policy in
//! [`crate::http`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::http::post_json_with_retry;
use crate::index::{IndexStats, VectorIndex};
use crate::models::SearchResult;

pub struct PineconeIndex {
    client: reqwest::Client,
    host: String,
    namespace: String,
    headers: HeaderMap,
    max_retries: u32,
}

impl PineconeIndex {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let api_key = std::env::var("PINECONE_API_KEY")
            .map_err(|_| Error::VectorIndex("PINECONE_API_KEY not set".to_string()))?;
        let host = config
            .host
            .clone()
            .ok_or_else(|| Error::VectorIndex("index.host not configured".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(&api_key)
                .map_err(|_| Error::VectorIndex("PINECONE_API_KEY is not a valid header value".to_string()))?,
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::VectorIndex(e.to_string()))?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone(),
            headers,
            max_retries: config.max_retries,
        })
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        let url = format!("{}{path}", self.host);
        post_json_with_retry(&self.client, &url, &self.headers, &body, self.max_retries)
            .await
            .map_err(Error::VectorIndex)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let body = serde_json::json!({
            "vectors": [ {
                "id": id,
                "values": vector,
                "metadata": metadata,
            } ],
            "namespace": self.namespace,
        });
        self.post("/vectors/upsert", body).await?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let body = serde_json::json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "namespace": self.namespace,
        });
        let json = self.post("/query", body).await?;
        parse_matches(&json)
    }

    async fn delete_document(&self, document_id: &str) -> Result<()> {
        let body = serde_json::json!({
            "filter": { "document_id": { "$eq": document_id } },
            "namespace": self.namespace,
        });
        self.post("/vectors/delete", body).await?;
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let json = self.post("/describe_index_stats", serde_json::json!({})).await?;
        let total_vectors = json
            .get("totalVectorCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let dimension = json
            .get("dimension")
            .and_then(|v| v.as_u64())
            .map(|d| d as u32);
        Ok(IndexStats {
            total_vectors,
            dimension,
        })
    }
}

/// Turn a Pinecone query response into ordered [`SearchResult`]s.
fn parse_matches(json: &serde_json::Value) -> Result<Vec<SearchResult>> {
    let matches = json
        .get("matches")
        .and_then(|m| m.as_array())
        .ok_or_else(|| Error::VectorIndex("query response missing matches".to_string()))?;

    let mut results = Vec::with_capacity(matches.len());
    for m in matches {
        let id = m
            .get("id")
            .and_then(|i| i.as_str())
            .unwrap_or_default()
            .to_string();
        let similarity = m.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0) as f32;

        let mut metadata = HashMap::new();
        if let Some(obj) = m.get("metadata").and_then(|md| md.as_object()) {
            for (k, v) in obj {
                let value = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                metadata.insert(k.clone(), value);
            }
        }

        let text = metadata.get("text").cloned().unwrap_or_default();
        results.push(SearchResult {
            id,
            text,
            metadata,
            similarity,
        });
    }
    Ok(results)
}
