//! HTTP API for document upload, reading, search and AI tasks.
//!
//! Uploaded documents live in one in-memory [`Session`] shared by all
//! handlers. A document becomes readable only once its extraction has
//! finished successfully.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/api/documents` | Multipart upload and batch extraction |
//! | `GET`  | `/api/documents` | Ready documents with stats |
//! | `GET`  | `/api/documents/{id}` | One document, full text included |
//! | `DELETE` | `/api/documents/{id}` | Remove a ready document |
//! | `GET`  | `/api/documents/{id}/pages/{n}` | Page text plus rendered sections |
//! | `GET`  | `/api/documents/{id}/search?q=&case_sensitive=` | Literal search |
//! | `POST` | `/api/summarize` | `{ text }` → `{ summary }` |
//! | `POST` | `/api/ai-qna/ask-question` | `{ documentText, question }` → `{ answer }` |
//! | `POST` | `/api/ai-qna/generate-questions` | `{ documentText, numQuestions }` → `{ questions }` |
//! | `POST` | `/api/ai/explain` | `{ fullText, promptType?, customPrompt? }` → `{ analysis }` |
//! | `POST` | `/api/insight-mirror/analyze` | `{ text }` → insights object |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "document not found: doc_1", "details": "..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `conflict` (409),
//! `payload_too_large` (413), `unsupported_format` (415), `internal` (500),
//! `gateway_error` (502), `gateway_disabled` (503), `gateway_timeout` (504).

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::chunk;
use crate::config::Config;
use crate::extract::{create_engine, Extractor, FailureKind};
use crate::format::{self, DocumentFormat};
use crate::gateway::{prompts::PromptType, Gateway, GatewayError};
use crate::ingest::{self, BatchOptions};
use crate::models::{DocumentStats, ExtractionFailure, SourceFile, UploadedDocument};
use crate::progress::NoProgress;
use crate::search::{self, SearchOptions, SearchResults};
use crate::session::{Session, SessionError};
use crate::structure::{self, Section};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    extractor: Extractor,
    session: Arc<RwLock<Session>>,
    gateway: Gateway,
}

impl AppState {
    pub fn new(config: Config, extractor: Extractor, gateway: Gateway) -> Self {
        Self {
            config: Arc::new(config),
            extractor,
            session: Arc::new(RwLock::new(Session::new())),
            gateway,
        }
    }

    /// OCR engine and gateway provider as configured.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let extractor = Extractor::new(create_engine(&config.ocr));
        let gateway = Gateway::from_config(&config.gateway)?;
        Ok(Self::new(config.clone(), extractor, gateway))
    }
}

/// Starts the HTTP server on `[server].bind` and runs until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        addr = %config.server.bind,
        ocr = state.extractor.ocr_engine().name(),
        gateway = state.gateway.provider_name(),
        "SmartDoc server listening"
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let limits = &state.config.limits;
    // Whole batch plus room for multipart framing.
    let body_limit = (limits.max_file_bytes as usize)
        .saturating_mul(limits.max_batch_files)
        .saturating_add(1024 * 1024);

    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/api/documents",
            post(handle_upload).get(handle_list_documents),
        )
        .route(
            "/api/documents/{id}",
            get(handle_get_document).delete(handle_remove_document),
        )
        .route("/api/documents/{id}/pages/{n}", get(handle_page))
        .route("/api/documents/{id}/search", get(handle_search))
        .route("/api/summarize", post(handle_summarize))
        .route("/api/ai-qna/ask-question", post(handle_ask_question))
        .route(
            "/api/ai-qna/generate-questions",
            post(handle_generate_questions),
        )
        .route("/api/ai/explain", post(handle_explain))
        .route("/api/insight-mirror/analyze", post(handle_insights))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(&state.config.server.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return cors.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(allowed))
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
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<String>,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: Option<String>) -> Self {
        self.details = details.filter(|d| !d.is_empty());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
                details: self.details,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::NOT_FOUND, "not_found", message)
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(_) => not_found(e.to_string()),
            SessionError::InvalidTransition { .. } => {
                AppError::new(StatusCode::CONFLICT, "conflict", e.to_string())
            }
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        let details = e.detail().map(str::to_string);
        let (status, code) = match &e {
            GatewayError::Validation(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            GatewayError::Disabled(_) => (StatusCode::SERVICE_UNAVAILABLE, "gateway_disabled"),
            GatewayError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "gateway_timeout"),
            GatewayError::Upstream { .. } | GatewayError::InvalidResponse(_) => {
                (StatusCode::BAD_GATEWAY, "gateway_error")
            }
        };
        AppError::new(status, code, e.to_string()).with_details(details)
    }
}

/// A lone file that failed admission gets a status of its own.
fn single_file_error(failure: &ExtractionFailure) -> AppError {
    let (status, code) = match failure.kind {
        FailureKind::UnsupportedFormat => (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_format"),
        FailureKind::FileTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
        _ => (StatusCode::BAD_REQUEST, "bad_request"),
    };
    AppError::new(status, code, failure.message.clone())
        .with_details(Some(format!("{}: {}", failure.name, failure.kind)))
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

// ============ Documents ============

#[derive(Serialize)]
struct DocumentSummary {
    id: String,
    name: String,
    format: DocumentFormat,
    checksum: String,
    extracted_at: DateTime<Utc>,
    stats: DocumentStats,
}

impl DocumentSummary {
    fn of(doc: &UploadedDocument, page_chars: usize) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.name.clone(),
            format: doc.format.clone(),
            checksum: doc.checksum.clone(),
            extracted_at: doc.extracted_at,
            stats: doc.stats(page_chars),
        }
    }
}

#[derive(Serialize)]
struct UploadResponse {
    documents: Vec<DocumentSummary>,
    failures: Vec<ExtractionFailure>,
}

/// Handler for `POST /api/documents`.
///
/// Every multipart field carrying a file name is one upload. Files are
/// registered in the session, extracted as one batch, and each entry is
/// then finished with its own result.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let media_type = field
            .content_type()
            .map(str::to_string)
            .filter(|t| t != format::MIME_OCTET_STREAM)
            .unwrap_or_else(|| format::guess_media_type(std::path::Path::new(&name)).to_string());
        let bytes = field.bytes().await.map_err(multipart_error)?;
        files.push(SourceFile::new(name, media_type, bytes.to_vec()));
    }

    if files.is_empty() {
        return Err(bad_request("No files uploaded"));
    }
    let options = BatchOptions::from_limits(&state.config.limits);
    if files.len() > options.max_files {
        return Err(bad_request(format!(
            "Maximum {} files allowed",
            options.max_files
        )));
    }

    let ids: Vec<String> = {
        let mut session = state.session.write().await;
        let mut ids = Vec::with_capacity(files.len());
        for file in &files {
            let id = session.begin_upload(&file.name);
            session.start_extracting(&id)?;
            ids.push(id);
        }
        ids
    };

    let single = files.len() == 1;
    let results = ingest::extract_batch_results(
        files,
        &options,
        &state.config.limits,
        &state.extractor,
        &NoProgress,
    )
    .await
    .map_err(|e| bad_request(e.to_string()))?;

    let page_chars = state.config.chunking.page_chars;
    let mut response = UploadResponse {
        documents: Vec::new(),
        failures: Vec::new(),
    };
    {
        let mut session = state.session.write().await;
        for (id, result) in ids.iter().zip(results) {
            if let Err(failure) = &result {
                response.failures.push(failure.clone());
            }
            session.finish(id, result)?;
            if let Some(doc) = session.get(id) {
                response.documents.push(DocumentSummary::of(doc, page_chars));
            }
        }
    }

    if single {
        if let Some(failure) = response.failures.first() {
            return Err(single_file_error(failure));
        }
    }
    Ok(Json(response))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            "Upload exceeds the allowed size",
        )
    } else {
        bad_request(format!("Multipart error: {}", e.body_text()))
    }
}

#[derive(Serialize)]
struct DocumentList {
    documents: Vec<DocumentSummary>,
}

async fn handle_list_documents(State(state): State<AppState>) -> Json<DocumentList> {
    let page_chars = state.config.chunking.page_chars;
    let session = state.session.read().await;
    Json(DocumentList {
        documents: session
            .documents()
            .into_iter()
            .map(|d| DocumentSummary::of(d, page_chars))
            .collect(),
    })
}

#[derive(Serialize)]
struct DocumentDetail {
    #[serde(flatten)]
    summary: DocumentSummary,
    content: String,
}

async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentDetail>, AppError> {
    let session = state.session.read().await;
    let doc = ready_document(&session, &id)?;
    Ok(Json(DocumentDetail {
        summary: DocumentSummary::of(doc, state.config.chunking.page_chars),
        content: doc.content.clone(),
    }))
}

#[derive(Serialize)]
struct RemoveResponse {
    id: String,
    state: String,
}

async fn handle_remove_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RemoveResponse>, AppError> {
    let mut session = state.session.write().await;
    session.remove(&id)?;
    Ok(Json(RemoveResponse {
        id,
        state: "REMOVED".to_string(),
    }))
}

fn ready_document<'a>(session: &'a Session, id: &str) -> Result<&'a UploadedDocument, AppError> {
    match session.get(id) {
        Some(doc) => Ok(doc),
        None => match session.state(id) {
            Some(state) => Err(not_found(format!("document {} is {}", id, state))),
            None => Err(not_found(format!("document not found: {}", id))),
        },
    }
}

// ============ GET /api/documents/{id}/pages/{n} ============

#[derive(Serialize)]
struct PageResponse {
    id: String,
    page: usize,
    pages: usize,
    text: String,
    sections: Vec<Section>,
}

async fn handle_page(
    State(state): State<AppState>,
    Path((id, n)): Path<(String, String)>,
) -> Result<Json<PageResponse>, AppError> {
    let n: usize = n
        .parse()
        .map_err(|_| bad_request(format!("invalid page number: {}", n)))?;
    let page_chars = state.config.chunking.page_chars;
    let session = state.session.read().await;
    let doc = ready_document(&session, &id)?;
    let pages = chunk::page_count(&doc.content, page_chars);

    let text = match chunk::page(&doc.content, n, page_chars) {
        Some(text) => text,
        // An empty document still shows one empty page.
        None if n == 1 && doc.content.is_empty() => "",
        None => {
            return Err(not_found(format!(
                "page {} out of range (document has {} pages)",
                n, pages
            )))
        }
    };

    Ok(Json(PageResponse {
        id,
        page: n,
        pages,
        text: text.to_string(),
        sections: structure::render(text),
    }))
}

// ============ GET /api/documents/{id}/search ============

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default)]
    case_sensitive: bool,
}

#[derive(Serialize)]
struct SearchResponse {
    id: String,
    query: String,
    #[serde(flatten)]
    results: SearchResults,
}

async fn handle_search(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let session = state.session.read().await;
    let doc = ready_document(&session, &id)?;
    let options = SearchOptions {
        case_sensitive: params.case_sensitive,
        page_chars: state.config.chunking.page_chars,
    };
    let results =
        search::search(&doc.content, &params.q, &options).map_err(|e| bad_request(e.to_string()))?;
    Ok(Json(SearchResponse {
        id,
        query: params.q,
        results,
    }))
}

// ============ AI gateway ============

#[derive(Deserialize)]
struct SummarizeRequest {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct SummarizeResponse {
    summary: String,
}

async fn handle_summarize(
    State(state): State<AppState>,
    Json(req): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, AppError> {
    let summary = state.gateway.summarize(&req.text).await?;
    Ok(Json(SummarizeResponse { summary }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AskQuestionRequest {
    #[serde(default)]
    document_text: String,
    #[serde(default)]
    question: String,
}

#[derive(Serialize)]
struct AskQuestionResponse {
    answer: String,
}

async fn handle_ask_question(
    State(state): State<AppState>,
    Json(req): Json<AskQuestionRequest>,
) -> Result<Json<AskQuestionResponse>, AppError> {
    let answer = state
        .gateway
        .answer_question(&req.document_text, &req.question)
        .await?;
    Ok(Json(AskQuestionResponse { answer }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateQuestionsRequest {
    #[serde(default)]
    document_text: String,
    #[serde(default = "default_num_questions")]
    num_questions: usize,
}

fn default_num_questions() -> usize {
    3
}

#[derive(Serialize)]
struct GenerateQuestionsResponse {
    questions: Vec<String>,
}

async fn handle_generate_questions(
    State(state): State<AppState>,
    Json(req): Json<GenerateQuestionsRequest>,
) -> Result<Json<GenerateQuestionsResponse>, AppError> {
    let questions = state
        .gateway
        .generate_questions(&req.document_text, req.num_questions)
        .await?;
    Ok(Json(GenerateQuestionsResponse { questions }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExplainRequest {
    #[serde(default)]
    full_text: String,
    #[serde(default)]
    prompt_type: Option<String>,
    #[serde(default)]
    custom_prompt: Option<String>,
}

#[derive(Serialize)]
struct ExplainResponse {
    analysis: String,
}

/// Unknown prompt types fall back to the default selection.
async fn handle_explain(
    State(state): State<AppState>,
    Json(req): Json<ExplainRequest>,
) -> Result<Json<ExplainResponse>, AppError> {
    let prompt_type = req.prompt_type.as_deref().and_then(PromptType::parse);
    let analysis = state
        .gateway
        .explain(&req.full_text, prompt_type, req.custom_prompt.as_deref())
        .await?;
    Ok(Json(ExplainResponse { analysis }))
}

#[derive(Deserialize)]
struct InsightRequest {
    #[serde(default)]
    text: String,
}

async fn handle_insights(
    State(state): State<AppState>,
    Json(req): Json<InsightRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(state.gateway.insights(&req.text).await?))
}
