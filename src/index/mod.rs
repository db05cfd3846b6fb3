//! Vector index abstraction.
//!
//! [`VectorIndex`] is the seam between the pipeline and vector storage.
//! Two implementations exist: [`memory::MemoryIndex`] (volatile, for
//! local runs and tests) and [`pinecone::PineconeIndex`] (REST client
//! for a managed index). [`create_index`] picks one from configuration.

pub mod memory;
pub mod pinecone;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::models::SearchResult;

/// Aggregate counters reported by an index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub total_vectors: u64,
    pub dimension: Option<u32>,
}

/// Storage and similarity search over embedding records.
///
/// Record ids are `{document_id}_chunk_{index}`; metadata always carries
/// `text`, `document_id`, `chunk_id`, `document_name`, `category` and
/// `uploaded_by` so matches can be rendered without a second lookup.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite one record.
    async fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        metadata: HashMap<String, String>,
    ) -> Result<()>;

    /// The `top_k` nearest records by cosine similarity, best first.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;

    /// Remove every record belonging to a document.
    async fn delete_document(&self, document_id: &str) -> Result<()>;

    async fn stats(&self) -> Result<IndexStats>;
}

/// Instantiate the index named by the configuration.
pub fn create_index(config: &IndexConfig) -> Result<Arc<dyn VectorIndex>> {
    match config.provider.as_str() {
        "memory" => Ok(Arc::new(memory::MemoryIndex::new())),
        "pinecone" => Ok(Arc::new(pinecone::PineconeIndex::new(config)?)),
        other => Err(Error::VectorIndex(format!(
            "unknown index provider: {other}"
        ))),
    }
}

/// Cosine similarity in `[-1.0, 1.0]`; `0.0` for empty or mismatched
/// vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
