//! Typed error kinds shared by the core pipeline and its collaborators.
//!
//! Collaborator traits (embedding gateway, generative provider, vector
//! index, document store) return these so that orchestration code can
//! distinguish failure classes without inspecting provider payloads.
//! Nothing here crosses the transport boundary verbatim; the pipeline
//! and orchestrator fold errors into outcome types with user-safe
//! messages.

use thiserror::Error;

/// Failure classes for document ingestion and question answering.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed caller input: degenerate question, empty file, bad upload.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No text could be recovered from a document.
    #[error("text extraction failed: {0}")]
    Extraction(String),

    /// The embedding gateway failed or returned an empty vector.
    #[error("embedding provider error: {0}")]
    EmbeddingProvider(String),

    /// The generative provider failed or returned a blank completion.
    #[error("generation provider error: {0}")]
    GenerationProvider(String),

    /// The vector index rejected an upsert, query, or delete.
    #[error("vector index error: {0}")]
    VectorIndex(String),

    /// Unknown document id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Document metadata persistence or file storage failed.
    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}
