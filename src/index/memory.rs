//! Brute-force in-memory vector index.
//!
//! Volatile, intended for local runs and tests. Queries score every
//! record with cosine similarity, sort descending, and keep the top K.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::index::{cosine_similarity, IndexStats, VectorIndex};
use crate::models::SearchResult;

struct Record {
    id: String,
    vector: Vec<f32>,
    metadata: HashMap<String, String>,
}

#[derive(Default)]
pub struct MemoryIndex {
    records: RwLock<Vec<Record>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let mut records = self.records.write().await;
        records.retain(|r| r.id != id);
        records.push(Record {
            id: id.to_string(),
            vector,
            metadata,
        });
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let records = self.records.read().await;

        let mut results: Vec<SearchResult> = records
            .iter()
            .map(|r| SearchResult {
                id: r.id.clone(),
                text: r.metadata.get("text").cloned().unwrap_or_default(),
                metadata: r.metadata.clone(),
                similarity: cosine_similarity(&r.vector, vector),
            })
            .collect();

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }

    async fn delete_document(&self, document_id: &str) -> Result<()> {
        let mut records = self.records.write().await;
        records.retain(|r| {
            r.metadata.get("document_id").map(|d| d.as_str()) != Some(document_id)
        });
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let records = self.records.read().await;
        let dimension = records.first().map(|r| r.vector.len() as u32);
        Ok(IndexStats {
            total_vectors: records.len() as u64,
            dimension,
        })
    }
}
