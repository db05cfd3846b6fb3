//! Core data models for the ingestion and retrieval pipeline.
//!
//! These types flow between the chunker, the ingestion pipeline, the
//! vector index, and the retrieval orchestrator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Processing state of an uploaded document.
///
/// The lifecycle is one-directional: `Uploaded → Processing →
/// {Completed | Failed}`. `Inactive` is reachable only from a terminal
/// state. Re-processing re-enters `Processing` from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
    Inactive,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Uploaded => "UPLOADED",
            ProcessingStatus::Processing => "PROCESSING",
            ProcessingStatus::Completed => "COMPLETED",
            ProcessingStatus::Failed => "FAILED",
            ProcessingStatus::Inactive => "INACTIVE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UPLOADED" => Some(ProcessingStatus::Uploaded),
            "PROCESSING" => Some(ProcessingStatus::Processing),
            "COMPLETED" => Some(ProcessingStatus::Completed),
            "FAILED" => Some(ProcessingStatus::Failed),
            "INACTIVE" => Some(ProcessingStatus::Inactive),
            _ => None,
        }
    }

    /// Terminal states: processing has finished one way or the other.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Failed)
    }

    /// Deactivation is only legal from a terminal state.
    pub fn can_deactivate(&self) -> bool {
        self.is_terminal()
    }
}

/// One uploaded source file under management.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// UUID string.
    pub id: String,
    /// Unique on-disk file name under the storage root.
    pub file_name: String,
    /// Display name as uploaded (used for source attribution).
    pub original_name: String,
    /// Category tag, e.g. "HR", "POLICIES", "ONBOARDING".
    pub category: String,
    pub description: Option<String>,
    /// Unix timestamps (UTC seconds).
    pub upload_date: i64,
    pub last_modified: i64,
    /// Identity of the uploader.
    pub uploaded_by: String,
    pub status: ProcessingStatus,
    /// SHA-256 of the file content, used as the dedup key.
    pub file_hash: String,
    pub file_size: i64,
    /// Absolute path of the stored file.
    pub file_path: String,
    pub mime_type: String,
}

/// A contiguous, size-bounded span of a document's extracted text.
///
/// Created during ingestion, never mutated; destroyed when the owning
/// document's vectors are purged.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub document_id: String,
    /// Zero-based sequence index within the document.
    pub index: usize,
    pub text: String,
}

impl Chunk {
    /// Id of the embedding record backing this chunk.
    pub fn record_id(&self) -> String {
        format!("{}_chunk_{}", self.document_id, self.index)
    }
}

/// The retrieval-time view of a matched embedding record.
///
/// Ephemeral: constructed per query, never persisted.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Record id: `{document_id}_chunk_{index}`.
    pub id: String,
    /// Chunk text recovered from the record metadata.
    pub text: String,
    pub metadata: HashMap<String, String>,
    /// Cosine similarity in [-1, 1]; 1.0 = identical.
    pub similarity: f32,
}

impl SearchResult {
    pub fn distance(&self) -> f32 {
        1.0 - self.similarity
    }

    /// Display name of the owning document, if recorded.
    pub fn document_name(&self) -> Option<&str> {
        self.metadata
            .get("document_name")
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// Result of one document ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingOutcome {
    pub success: bool,
    pub message: String,
    pub chunks_succeeded: usize,
    pub chunks_total: usize,
}

impl ProcessingOutcome {
    pub fn success(message: impl Into<String>, succeeded: usize, total: usize) -> Self {
        Self {
            success: true,
            message: message.into(),
            chunks_succeeded: succeeded,
            chunks_total: total,
        }
    }

    pub fn failure(message: impl Into<String>, total: usize) -> Self {
        Self {
            success: false,
            message: message.into(),
            chunks_succeeded: 0,
            chunks_total: total,
        }
    }
}

/// Result of answering one question.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub success: bool,
    /// Generated answer on success; user-safe failure message otherwise.
    pub answer: String,
    /// Distinct source document names, first-seen order.
    pub sources: Vec<String>,
}

impl ChatOutcome {
    pub fn success(answer: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            success: true,
            answer: answer.into(),
            sources,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            answer: message.into(),
            sources: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for s in [
            ProcessingStatus::Uploaded,
            ProcessingStatus::Processing,
            ProcessingStatus::Completed,
            ProcessingStatus::Failed,
            ProcessingStatus::Inactive,
        ] {
            assert_eq!(ProcessingStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(ProcessingStatus::parse("DONE"), None);
    }

    #[test]
    fn deactivation_only_from_terminal_states() {
        assert!(ProcessingStatus::Completed.can_deactivate());
        assert!(ProcessingStatus::Failed.can_deactivate());
        assert!(!ProcessingStatus::Uploaded.can_deactivate());
        assert!(!ProcessingStatus::Processing.can_deactivate());
        assert!(!ProcessingStatus::Inactive.can_deactivate());
    }

    #[test]
    fn chunk_record_id_scheme() {
        let chunk = Chunk {
            document_id: "d1".to_string(),
            index: 3,
            text: "text".to_string(),
        };
        assert_eq!(chunk.record_id(), "d1_chunk_3");
    }

    #[test]
    fn distance_is_one_minus_similarity() {
        let r = SearchResult {
            id: "d1_chunk_0".to_string(),
            text: "text".to_string(),
            metadata: HashMap::new(),
            similarity: 0.75,
        };
        assert!((r.distance() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn empty_document_name_is_none() {
        let mut metadata = HashMap::new();
        metadata.insert("document_name".to_string(), String::new());
        let r = SearchResult {
            id: "d1_chunk_0".to_string(),
            text: "text".to_string(),
            metadata,
            similarity: 0.9,
        };
        assert_eq!(r.document_name(), None);
    }
}
