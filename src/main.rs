//! # docqa CLI
//!
//! The `docqa` binary manages the document corpus and answers questions
//! against it.
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa init` | Create the SQLite database and run schema migrations |
//! | `docqa ingest <file>` | Upload and process a PDF or DOCX file |
//! | `docqa reprocess <id>` | Re-run the pipeline for a stored document |
//! | `docqa ask "<question>"` | Answer a question against the corpus |
//! | `docqa list` | List all documents |
//! | `docqa get <id>` | Show one document |
//! | `docqa delete <id>` | Remove a document entirely |
//! | `docqa deactivate <id>` | Retire a document from retrieval |
//! | `docqa stats` | Corpus and index counters |
//! | `docqa serve` | Start the JSON HTTP server |

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use docqa::config::{load_config, Config};
use docqa::embedding::{Embedder, GeminiEmbedder};
use docqa::generate::{GeminiGenerator, Generator};
use docqa::index::create_index;
use docqa::ingest::Pipeline;
use docqa::models::Document;
use docqa::rag::{corpus_stats, RagEngine};
use docqa::server::{run_server, AppState};
use docqa::store::{DocumentStore, SqliteStore};

/// docqa: question answering over a private document corpus.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docqa.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Retrieval-augmented question answering over a private document corpus",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the documents table. This
    /// command is idempotent; running it multiple times is safe.
    Init,

    /// Upload and process a document.
    Ingest {
        /// Path to a .pdf or .docx file.
        file: PathBuf,

        /// Category tag, e.g. HR, POLICIES, ONBOARDING.
        #[arg(long, default_value = "GENERAL")]
        category: String,

        /// Free-text description.
        #[arg(long)]
        description: Option<String>,

        /// Identity recorded as the uploader.
        #[arg(long, default_value = "cli")]
        uploaded_by: String,
    },

    /// Re-run the pipeline for a stored document.
    ///
    /// Existing vectors are purged first, so the index ends up reflecting
    /// exactly the current run.
    Reprocess {
        /// Document id.
        id: String,
    },

    /// Answer a question against the corpus.
    Ask {
        /// The question text.
        question: String,
    },

    /// List all documents, newest first.
    List,

    /// Show one document.
    Get {
        /// Document id.
        id: String,
    },

    /// Remove a document entirely: vectors, stored file, metadata.
    Delete {
        /// Document id.
        id: String,
    },

    /// Retire a document from retrieval, keeping file and metadata.
    Deactivate {
        /// Document id.
        id: String,
    },

    /// Print corpus and index counters.
    Stats,

    /// Start the JSON HTTP server.
    Serve,
}

/// The fully wired application components.
struct Components {
    store: Arc<dyn DocumentStore>,
    index: Arc<dyn docqa::index::VectorIndex>,
    pipeline: Arc<Pipeline>,
    engine: Arc<RagEngine>,
}

/// Store and index only. Enough for read-side commands, and it does not
/// require provider API keys in the environment.
async fn open_store(
    config: &Config,
) -> anyhow::Result<(Arc<dyn DocumentStore>, Arc<dyn docqa::index::VectorIndex>)> {
    let pool = docqa::db::connect(config).await?;
    docqa::migrate::run_migrations(&pool).await?;
    let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::new(pool));
    let index = create_index(&config.index)?;
    Ok((store, index))
}

async fn build_components(config: &Config) -> anyhow::Result<Components> {
    let (store, index) = open_store(config).await?;

    let embedder: Arc<dyn Embedder> = Arc::new(GeminiEmbedder::new(&config.gemini)?);
    let generator: Arc<dyn Generator> = Arc::new(GeminiGenerator::new(&config.gemini)?);

    let pipeline = Arc::new(Pipeline::new(
        config,
        store.clone(),
        embedder.clone(),
        index.clone(),
    ));
    let engine = Arc::new(RagEngine::new(
        config.retrieval.clone(),
        embedder,
        generator,
        index.clone(),
    ));

    Ok(Components {
        store,
        index,
        pipeline,
        engine,
    })
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn print_document(doc: &Document) {
    println!("id:            {}", doc.id);
    println!("name:          {}", doc.original_name);
    println!("category:      {}", doc.category);
    if let Some(desc) = &doc.description {
        println!("description:   {}", desc);
    }
    println!("status:        {}", doc.status.as_str());
    println!("uploaded by:   {}", doc.uploaded_by);
    println!("uploaded at:   {}", format_ts_iso(doc.upload_date));
    println!("last modified: {}", format_ts_iso(doc.last_modified));
    println!("size:          {} bytes", doc.file_size);
    println!("mime type:     {}", doc.mime_type);
    println!("file hash:     {}", doc.file_hash);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("docqa=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = docqa::db::connect(&config).await?;
            docqa::migrate::run_migrations(&pool).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            file,
            category,
            description,
            uploaded_by,
        } => {
            let components = build_components(&config).await?;
            let bytes = std::fs::read(&file)?;
            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("invalid file name: {}", file.display()))?;

            let doc = components
                .pipeline
                .upload(name, &bytes, &category, description, &uploaded_by)
                .await?;
            println!("Uploaded {} as {}", doc.original_name, doc.id);

            let outcome = components.pipeline.process_document(&doc.id).await?;
            println!("{}", outcome.message);
            if !outcome.success {
                std::process::exit(1);
            }
        }
        Commands::Reprocess { id } => {
            let components = build_components(&config).await?;
            let outcome = components.pipeline.reprocess(&id).await?;
            println!("{}", outcome.message);
            if !outcome.success {
                std::process::exit(1);
            }
        }
        Commands::Ask { question } => {
            let components = build_components(&config).await?;
            let outcome = components.engine.answer(&question).await?;
            println!("{}", outcome.answer);
            if !outcome.sources.is_empty() {
                println!();
                println!("Sources: {}", outcome.sources.join(", "));
            }
            if !outcome.success {
                std::process::exit(1);
            }
        }
        Commands::List => {
            let (store, _index) = open_store(&config).await?;
            let documents = store.list().await?;
            if documents.is_empty() {
                println!("No documents.");
            }
            for doc in documents {
                println!(
                    "{}  {:<10}  {:<12}  {}  {}",
                    doc.id,
                    doc.status.as_str(),
                    doc.category,
                    format_ts_iso(doc.upload_date),
                    doc.original_name
                );
            }
        }
        Commands::Get { id } => {
            let (store, _index) = open_store(&config).await?;
            let doc = store.load(&id).await?;
            print_document(&doc);
        }
        Commands::Delete { id } => {
            let components = build_components(&config).await?;
            components.pipeline.delete(&id).await?;
            println!("Deleted {}", id);
        }
        Commands::Deactivate { id } => {
            let components = build_components(&config).await?;
            let doc = components.pipeline.deactivate(&id).await?;
            println!("Deactivated {} ({})", doc.id, doc.original_name);
        }
        Commands::Stats => {
            let (store, index) = open_store(&config).await?;
            let stats = corpus_stats(store.as_ref(), index.as_ref()).await?;
            println!("documents:  {}", stats.documents_total);
            for (status, n) in &stats.documents_by_status {
                println!("  {:<10} {}", status, n);
            }
            println!("vectors:    {}", stats.index.total_vectors);
            match stats.index.dimension {
                Some(d) => println!("dimension:  {}", d),
                None => println!("dimension:  unknown"),
            }
        }
        Commands::Serve => {
            let components = build_components(&config).await?;
            let state = AppState {
                pipeline: components.pipeline,
                engine: components.engine,
                store: components.store,
                index: components.index,
            };
            run_server(&config.server.bind, state).await?;
        }
    }

    Ok(())
}
