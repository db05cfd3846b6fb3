//! Document metadata persistence.
//!
//! [`DocumentStore`] is the seam in front of the SQLite `documents`
//! table so the pipeline and orchestrator can be exercised against
//! in-memory fakes. [`SqliteStore`] is the real implementation.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::error::{Error, Result};
use crate::models::{Document, ProcessingStatus};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or fully replace a document row.
    async fn save(&self, document: &Document) -> Result<()>;

    /// Load by id; [`Error::NotFound`] when absent.
    async fn load(&self, id: &str) -> Result<Document>;

    /// All documents, newest upload first.
    async fn list(&self) -> Result<Vec<Document>>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Dedup lookup by content hash.
    async fn find_by_hash(&self, file_hash: &str) -> Result<Option<Document>>;

    /// Update processing status and bump `last_modified`.
    async fn set_status(&self, id: &str, status: ProcessingStatus) -> Result<()>;

    /// Document counts per processing status.
    async fn status_counts(&self) -> Result<Vec<(ProcessingStatus, u64)>>;
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document> {
    let status_str: String = row.try_get("status")?;
    let status = ProcessingStatus::parse(&status_str)
        .ok_or_else(|| Error::Storage(format!("unknown status in database: {status_str}")))?;

    Ok(Document {
        id: row.try_get("id")?,
        file_name: row.try_get("file_name")?,
        original_name: row.try_get("original_name")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        upload_date: row.try_get("upload_date")?,
        last_modified: row.try_get("last_modified")?,
        uploaded_by: row.try_get("uploaded_by")?,
        status,
        file_hash: row.try_get("file_hash")?,
        file_size: row.try_get("file_size")?,
        file_path: row.try_get("file_path")?,
        mime_type: row.try_get("mime_type")?,
    })
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn save(&self, document: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO documents
                (id, file_name, original_name, category, description,
                 upload_date, last_modified, uploaded_by, status,
                 file_hash, file_size, file_path, mime_type)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&document.id)
        .bind(&document.file_name)
        .bind(&document.original_name)
        .bind(&document.category)
        .bind(&document.description)
        .bind(document.upload_date)
        .bind(document.last_modified)
        .bind(&document.uploaded_by)
        .bind(document.status.as_str())
        .bind(&document.file_hash)
        .bind(document.file_size)
        .bind(&document.file_path)
        .bind(&document.mime_type)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Document> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("document {id}")))?;
        row_to_document(&row)
    }

    async fn list(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query("SELECT * FROM documents ORDER BY upload_date DESC, id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_document).collect()
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("document {id}")));
        }
        Ok(())
    }

    async fn find_by_hash(&self, file_hash: &str) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT * FROM documents WHERE file_hash = ? LIMIT 1")
            .bind(file_hash)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn set_status(&self, id: &str, status: ProcessingStatus) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let result =
            sqlx::query("UPDATE documents SET status = ?, last_modified = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("document {id}")));
        }
        Ok(())
    }

    async fn status_counts(&self) -> Result<Vec<(ProcessingStatus, u64)>> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM documents GROUP BY status")
            .fetch_all(&self.pool)
            .await?;
        let mut counts = Vec::with_capacity(rows.len());
        for row in &rows {
            let status_str: String = row.try_get("status")?;
            let status = ProcessingStatus::parse(&status_str).ok_or_else(|| {
                Error::Storage(format!("unknown status in database: {status_str}"))
            })?;
            let n: i64 = row.try_get("n")?;
            counts.push((status, n as u64));
        }
        Ok(counts)
    }
}
