//! End-to-end exercise of the library: upload a document, process it,
//! then answer a question against the resulting index. Remote providers
//! are replaced with deterministic stubs; storage and metadata use a
//! scratch directory.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;

use docqa::config::{load_config, Config};
use docqa::embedding::Embedder;
use docqa::error::Result;
use docqa::generate::Generator;
use docqa::index::memory::MemoryIndex;
use docqa::ingest::Pipeline;
use docqa::models::ProcessingStatus;
use docqa::rag::{corpus_stats, RagEngine};
use docqa::store::{DocumentStore, SqliteStore};

/// Maps text onto a small fixed vector by hashing words. Deterministic,
/// and similar texts land near each other often enough for ranking
/// assertions.
struct HashEmbedder;

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; 8];
        for word in text.split_whitespace() {
            let mut h = 0usize;
            for b in word.to_lowercase().bytes() {
                h = h.wrapping_mul(31).wrapping_add(b as usize);
            }
            v[h % 8] += 1.0;
        }
        Ok(v)
    }
}

/// Echoes whether grounding context was present so tests can tell which
/// prompt shape reached the model.
struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if prompt.contains("Document excerpts:") {
            Ok("Grounded answer based on the provided excerpts.".to_string())
        } else {
            Ok("No supporting material was available.".to_string())
        }
    }
}

fn docx_bytes(text: &str) -> Vec<u8> {
    let xml = format!(
        r#"<w:document xmlns:w="x"><w:body><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:body></w:document>"#
    );
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        let opts = zip::write::SimpleFileOptions::default();
        writer.start_file("word/document.xml", opts).unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

async fn scratch_env(dir: &std::path::Path) -> (Config, Pipeline, RagEngine, Arc<SqliteStore>, Arc<MemoryIndex>) {
    let config_path = dir.join("docqa.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[db]
path = "{db}"

[storage]
path = "{storage}"

[chunking]
max_chars = 120
overlap_chars = 20

[server]
bind = "127.0.0.1:0"
"#,
            db = dir.join("docqa.sqlite").display(),
            storage = dir.join("files").display(),
        ),
    )
    .unwrap();
    let config = load_config(&config_path).unwrap();

    let pool = docqa::db::connect(&config).await.unwrap();
    docqa::migrate::run_migrations(&pool).await.unwrap();
    let store = Arc::new(SqliteStore::new(pool));
    let index = Arc::new(MemoryIndex::new());
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder);
    let generator: Arc<dyn Generator> = Arc::new(EchoGenerator);

    let pipeline = Pipeline::new(&config, store.clone(), embedder.clone(), index.clone());
    let engine = RagEngine::new(
        config.retrieval.clone(),
        embedder,
        generator,
        index.clone(),
    );
    (config, pipeline, engine, store, index)
}

const HANDBOOK: &str = "Employees accrue twenty days of paid vacation per year. \
    Vacation requests must be approved by a manager. Unused days carry over \
    for one year. Sick leave is unlimited but requires a note after three \
    days. Expense reports are filed monthly through the finance portal.";

#[tokio::test]
async fn ingest_then_ask_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let (_config, pipeline, engine, store, index) = scratch_env(tmp.path()).await;

    let doc = pipeline
        .upload("handbook.docx", &docx_bytes(HANDBOOK), "HR", None, "tests")
        .await
        .unwrap();
    let outcome = pipeline.process_document(&doc.id).await.unwrap();
    assert!(outcome.success);
    assert!(outcome.chunks_total >= 2, "expected multiple chunks");

    let stored = store.load(&doc.id).await.unwrap();
    assert_eq!(stored.status, ProcessingStatus::Completed);

    let answer = engine
        .answer("How many vacation days do employees get?")
        .await
        .unwrap();
    assert!(answer.success);
    assert_eq!(answer.answer, "Grounded answer based on the provided excerpts.");
    assert_eq!(answer.sources, vec!["handbook.docx"]);

    let stats = corpus_stats(store.as_ref(), index.as_ref()).await.unwrap();
    assert_eq!(stats.documents_total, 1);
    assert_eq!(stats.documents_by_status.get("COMPLETED"), Some(&1));
    assert_eq!(stats.index.total_vectors as usize, outcome.chunks_total);
}

#[tokio::test]
async fn asking_before_any_ingestion_gives_fallback() {
    let tmp = tempfile::tempdir().unwrap();
    let (_config, _pipeline, engine, _store, _index) = scratch_env(tmp.path()).await;

    let answer = engine.answer("What is the vacation policy?").await.unwrap();
    assert!(answer.success);
    assert!(answer.answer.contains("could not find"));
    assert!(answer.sources.is_empty());
}

#[tokio::test]
async fn deleted_document_stops_appearing_in_answers() {
    let tmp = tempfile::tempdir().unwrap();
    let (_config, pipeline, engine, store, index) = scratch_env(tmp.path()).await;

    let doc = pipeline
        .upload("handbook.docx", &docx_bytes(HANDBOOK), "HR", None, "tests")
        .await
        .unwrap();
    pipeline.process_document(&doc.id).await.unwrap();
    pipeline.delete(&doc.id).await.unwrap();

    let answer = engine
        .answer("How many vacation days do employees get?")
        .await
        .unwrap();
    assert!(answer.sources.is_empty());

    let stats = corpus_stats(store.as_ref(), index.as_ref()).await.unwrap();
    assert_eq!(stats.documents_total, 0);
    assert_eq!(stats.index.total_vectors, 0);
}
