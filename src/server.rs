//! JSON HTTP API over the pipeline and the retrieval engine.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Answer a question against the corpus |
//! | `GET`  | `/chat/suggestions` | Conversation starters |
//! | `POST` | `/documents` | Upload a document (base64 JSON body) |
//! | `GET`  | `/documents` | List documents, newest first |
//! | `GET`  | `/documents/{id}` | Fetch one document |
//! | `POST` | `/documents/{id}/reprocess` | Re-run the ingestion pipeline |
//! | `POST` | `/documents/{id}/deactivate` | Retire a document from retrieval |
//! | `DELETE` | `/documents/{id}` | Remove a document entirely |
//! | `GET`  | `/stats` | Corpus and index counters |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Error responses use a uniform envelope:
//!
//! ```json
//! { "error": { "code": "invalid_input", "message": "question is empty" } }
//! ```
//!
//! Codes: `invalid_input` (400), `not_found` (404), `internal` (500).
//! Provider failures during an otherwise valid question are not errors at
//! this layer; they come back as a 200 with `success = false`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser
//! clients.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::error::Error;
use crate::index::VectorIndex;
use crate::ingest::Pipeline;
use crate::models::{ChatOutcome, Document, ProcessingOutcome};
use crate::rag::{corpus_stats, CorpusStats, RagEngine};
use crate::store::DocumentStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub engine: Arc<RagEngine>,
    pub store: Arc<dyn DocumentStore>,
    pub index: Arc<dyn VectorIndex>,
}

/// Start the HTTP server on `bind_addr`. Runs until the process exits.
pub async fn run_server(bind_addr: &str, state: AppState) -> anyhow::Result<()> {
    let app = router(state);

    println!("docqa server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(handle_chat))
        .route("/chat/suggestions", get(handle_suggestions))
        .route("/documents", post(handle_upload).get(handle_list))
        .route("/documents/{id}", get(handle_get).delete(handle_delete))
        .route("/documents/{id}/reprocess", post(handle_reprocess))
        .route("/documents/{id}/deactivate", post(handle_deactivate))
        .route("/stats", get(handle_stats))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "invalid_input".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidInput(m) => bad_request(m),
            Error::NotFound(m) => not_found(m),
            other => {
                error!(error = %other, "request failed");
                internal(other.to_string())
            }
        }
    }
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    question: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatOutcome>, AppError> {
    let outcome = state.engine.answer(&req.question).await?;
    Ok(Json(outcome))
}

// ============ GET /chat/suggestions ============

#[derive(Serialize)]
struct SuggestionsResponse {
    questions: Vec<String>,
}

async fn handle_suggestions(State(state): State<AppState>) -> Json<SuggestionsResponse> {
    Json(SuggestionsResponse {
        questions: state.engine.suggested_questions(),
    })
}

// ============ POST /documents ============

#[derive(Deserialize)]
struct UploadRequest {
    file_name: String,
    /// File content, standard base64.
    content_base64: String,
    category: String,
    #[serde(default)]
    description: Option<String>,
    uploaded_by: String,
}

#[derive(Serialize)]
struct UploadResponse {
    document: Document,
    outcome: ProcessingOutcome,
}

async fn handle_upload(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&req.content_base64)
        .map_err(|_| bad_request("content_base64 is not valid base64"))?;

    let document = state
        .pipeline
        .upload(
            &req.file_name,
            &bytes,
            &req.category,
            req.description,
            &req.uploaded_by,
        )
        .await?;

    let outcome = state.pipeline.process_document(&document.id).await?;
    let document = state.store.load(&document.id).await?;

    Ok((StatusCode::CREATED, Json(UploadResponse { document, outcome })))
}

// ============ GET /documents ============

#[derive(Serialize)]
struct DocumentListResponse {
    documents: Vec<Document>,
}

async fn handle_list(
    State(state): State<AppState>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let documents = state.store.list().await?;
    Ok(Json(DocumentListResponse { documents }))
}

// ============ GET /documents/{id} ============

async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Document>, AppError> {
    let document = state.store.load(&id).await?;
    Ok(Json(document))
}

// ============ POST /documents/{id}/reprocess ============

async fn handle_reprocess(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProcessingOutcome>, AppError> {
    let outcome = state.pipeline.reprocess(&id).await?;
    Ok(Json(outcome))
}

// ============ POST /documents/{id}/deactivate ============

async fn handle_deactivate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Document>, AppError> {
    let document = state.pipeline.deactivate(&id).await?;
    Ok(Json(document))
}

// ============ DELETE /documents/{id} ============

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.pipeline.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============ GET /stats ============

async fn handle_stats(State(state): State<AppState>) -> Result<Json<CorpusStats>, AppError> {
    let stats = corpus_stats(state.store.as_ref(), state.index.as_ref()).await?;
    Ok(Json(stats))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
