//! Document ingestion pipeline.
//!
//! Owns the full lifecycle of an uploaded document: validation and
//! dedup on upload, then extract → clean → chunk → embed → upsert when
//! processing runs. Chunk embedding fans out one task per chunk and the
//! results are folded back into a single [`ProcessingOutcome`]; a failed
//! chunk is logged and counted, never fatal on its own. Only a run where
//! every chunk fails marks the document `FAILED`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::chunk::{chunk_text, clean_text};
use crate::config::Config;
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::extract::extract_text;
use crate::index::VectorIndex;
use crate::models::{Chunk, Document, ProcessingOutcome, ProcessingStatus};
use crate::storage::FileStorage;
use crate::store::DocumentStore;

pub struct Pipeline {
    storage: FileStorage,
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    max_chars: usize,
    overlap_chars: usize,
}

impl Pipeline {
    pub fn new(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            storage: FileStorage::new(&config.storage),
            store,
            embedder,
            index,
            max_chars: config.chunking.max_chars,
            overlap_chars: config.chunking.overlap_chars,
        }
    }

    /// Validate, dedup, and store an upload; the document starts in
    /// `UPLOADED` and is not yet processed.
    pub async fn upload(
        &self,
        original_name: &str,
        bytes: &[u8],
        category: &str,
        description: Option<String>,
        uploaded_by: &str,
    ) -> Result<Document> {
        let mime_type = self.storage.validate(original_name, bytes)?;

        let file_hash = FileStorage::content_hash(bytes);
        if let Some(existing) = self.store.find_by_hash(&file_hash).await? {
            return Err(Error::InvalidInput(format!(
                "identical content already uploaded as '{}' ({})",
                existing.original_name, existing.id
            )));
        }

        let (file_name, file_path) = self.storage.save(original_name, bytes)?;
        let now = chrono::Utc::now().timestamp();

        let document = Document {
            id: uuid::Uuid::new_v4().to_string(),
            file_name,
            original_name: original_name.to_string(),
            category: category.to_string(),
            description,
            upload_date: now,
            last_modified: now,
            uploaded_by: uploaded_by.to_string(),
            status: ProcessingStatus::Uploaded,
            file_hash,
            file_size: bytes.len() as i64,
            file_path: file_path.display().to_string(),
            mime_type: mime_type.to_string(),
        };
        self.store.save(&document).await?;

        info!(id = %document.id, name = %document.original_name, "document uploaded");
        Ok(document)
    }

    /// Run the extract → chunk → embed → upsert pipeline for a document.
    ///
    /// Provider and extraction failures are folded into the returned
    /// outcome (and the document's status); only infrastructure errors
    /// propagate as `Err`.
    pub async fn process_document(&self, id: &str) -> Result<ProcessingOutcome> {
        let document = self.store.load(id).await?;
        self.store
            .set_status(id, ProcessingStatus::Processing)
            .await?;

        let bytes = match self.storage.read(&document.file_name) {
            Ok(b) => b,
            Err(e) => return self.fail(id, format!("could not read stored file: {e}"), 0).await,
        };

        let text = match extract_text(&bytes, &document.mime_type) {
            Ok(t) => t,
            Err(e) => return self.fail(id, e.to_string(), 0).await,
        };

        let cleaned = clean_text(&text);
        let chunks: Vec<Chunk> = chunk_text(&cleaned, self.max_chars, self.overlap_chars)
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                document_id: document.id.clone(),
                index,
                text,
            })
            .collect();
        if chunks.is_empty() {
            return self
                .fail(id, "no text could be extracted from the document", 0)
                .await;
        }
        let total = chunks.len();
        info!(id, chunks = total, "processing document");

        let mut tasks: JoinSet<std::result::Result<usize, (usize, Error)>> = JoinSet::new();
        for chunk in chunks {
            let embedder = Arc::clone(&self.embedder);
            let index = Arc::clone(&self.index);
            let metadata = chunk_metadata(&document, &chunk);
            let record_id = chunk.record_id();
            let i = chunk.index;

            tasks.spawn(async move {
                let vector = embedder.embed(&chunk.text).await.map_err(|e| (i, e))?;
                index
                    .upsert(&record_id, vector, metadata)
                    .await
                    .map_err(|e| (i, e))?;
                Ok(i)
            });
        }

        let mut succeeded = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(_)) => succeeded += 1,
                Ok(Err((i, e))) => warn!(id, chunk = i, error = %e, "chunk failed"),
                Err(e) => warn!(id, error = %e, "chunk task panicked"),
            }
        }

        if succeeded == 0 {
            return self.fail(id, "all chunks failed to embed", total).await;
        }

        self.store
            .set_status(id, ProcessingStatus::Completed)
            .await?;
        info!(id, succeeded, total, "document processed");
        Ok(ProcessingOutcome::success(
            format!("document processed ({succeeded}/{total} chunks)"),
            succeeded,
            total,
        ))
    }

    /// Re-run processing from the stored file. Existing vectors are
    /// purged first so stale chunks from a longer earlier run cannot
    /// linger.
    pub async fn reprocess(&self, id: &str) -> Result<ProcessingOutcome> {
        let document = self.store.load(id).await?;
        self.index.delete_document(&document.id).await?;
        self.process_document(id).await
    }

    /// Remove a document entirely: vectors, stored file, metadata row.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let document = self.store.load(id).await?;
        self.index.delete_document(&document.id).await?;
        self.storage.delete(&document.file_name)?;
        self.store.delete(id).await?;
        info!(id, "document deleted");
        Ok(())
    }

    /// Retire a document from retrieval while keeping file and metadata.
    /// Only legal from a terminal state.
    pub async fn deactivate(&self, id: &str) -> Result<Document> {
        let document = self.store.load(id).await?;
        if !document.status.can_deactivate() {
            return Err(Error::InvalidInput(format!(
                "cannot deactivate a document in status {}",
                document.status.as_str()
            )));
        }
        self.index.delete_document(&document.id).await?;
        self.store
            .set_status(id, ProcessingStatus::Inactive)
            .await?;
        info!(id, "document deactivated");
        self.store.load(id).await
    }

    async fn fail(
        &self,
        id: &str,
        message: impl Into<String>,
        total: usize,
    ) -> Result<ProcessingOutcome> {
        let message = message.into();
        warn!(id, %message, "processing failed");
        self.store.set_status(id, ProcessingStatus::Failed).await?;
        Ok(ProcessingOutcome::failure(message, total))
    }
}

/// Metadata stored with every embedding record so query matches can be
/// rendered without a second lookup.
fn chunk_metadata(document: &Document, chunk: &Chunk) -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("text".to_string(), chunk.text.clone());
    m.insert("document_id".to_string(), chunk.document_id.clone());
    m.insert("chunk_id".to_string(), chunk.index.to_string());
    m.insert(
        "document_name".to_string(),
        document.original_name.clone(),
    );
    m.insert("category".to_string(), document.category.clone());
    m.insert("uploaded_by".to_string(), document.uploaded_by.clone());
    m
}
