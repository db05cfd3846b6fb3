//! # docqa
//!
//! Retrieval-augmented question answering over a private document corpus.
//!
//! Documents (PDF, DOCX) are uploaded, their text extracted, cleaned and
//! split into overlapping sentence-aligned chunks; each chunk is embedded
//! and stored in a vector index. Questions are embedded the same way,
//! matched against the index, and the best excerpts are handed to a
//! generative model as grounding context. Both halves are exposed through
//! a CLI and a JSON HTTP server.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────┐   ┌───────────────┐
//! │  Upload  │──▶│     Pipeline      │──▶│ Vector index  │
//! │ PDF/DOCX │   │ extract+chunk+    │   │ memory /      │
//! └──────────┘   │ embed             │   │ Pinecone      │
//!                └───────────────────┘   └───────┬───────┘
//!                                                │
//!                ┌───────────────────┐           │
//!   question ───▶│     RagEngine     │◀──────────┘
//!                │ retrieve+generate │
//!                └───────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Text cleanup and chunking |
//! | [`extract`] | PDF/DOCX text extraction |
//! | [`embedding`] | Embedding gateway (Gemini) |
//! | [`generate`] | Generative provider (Gemini) and prompts |
//! | [`index`] | Vector index abstraction (memory, Pinecone) |
//! | [`storage`] | On-disk file storage for uploads |
//! | [`store`] | Document metadata persistence (SQLite) |
//! | [`ingest`] | Ingestion pipeline |
//! | [`rag`] | Question answering |
//! | [`server`] | JSON HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generate;
pub(crate) mod http;
pub mod index;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod rag;
pub mod server;
pub mod storage;
pub mod store;
