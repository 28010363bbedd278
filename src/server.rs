//! HTTP server for the browser extension and dashboard clients.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/active_tab` | Ingest `{tabData}` or `{tabsData}` |
//! | `GET`  | `/tabs` | Latest capture (timestamp, data type, tabs) |
//! | `POST` | `/ask` | Match a question to a tab: `{question}` |
//! | `GET`  | `/history` | Last five questions and answers |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "success": false, "error": { "code": "invalid_shape", "message": "..." } }
//! ```
//!
//! Codes: `unsupported_content_type` (400), `malformed_json` (400),
//! `invalid_shape` (400), `storage_failure` (500). `/ask` uses
//! `malformed_json` and `invalid_shape` for bad request bodies.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted; the extension posts
//! from a `chrome-extension://` origin.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::ingest::{ingest, IngestError};
use crate::models::TabRecord;
use crate::query::{answer, match_tab, ChatEntry, ChatHistory};
use crate::retrieve::{latest_snapshot, TabSnapshot};
use crate::store::{FsStore, TabStore};

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TabStore>,
    history: Arc<Mutex<ChatHistory>>,
}

impl AppState {
    pub fn new(store: Arc<dyn TabStore>) -> Self {
        Self {
            store,
            history: Arc::new(Mutex::new(ChatHistory::new())),
        }
    }
}

/// Opens the configured storage directory and serves until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = FsStore::open(&config.storage.dir)?;
    let bind_addr = config.server.bind.clone();

    let app = router(
        AppState::new(Arc::new(store)),
        config.server.max_body_bytes,
    );

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(
        addr = %bind_addr,
        storage = %config.storage.dir.display(),
        "tab server listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}

/// `max_body_bytes: None` lifts axum's default 2 MB request body limit.
pub fn router(state: AppState, max_body_bytes: Option<usize>) -> Router {
    let body_limit = match max_body_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/active_tab", post(handle_active_tab))
        .route("/tabs", get(handle_tabs))
        .route("/ask", post(handle_ask))
        .route("/history", get(handle_history))
        .route("/health", get(handle_health))
        .layer(body_limit)
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
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
            success: false,
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: code.to_string(),
        message: message.into(),
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        let status = match err {
            IngestError::MalformedJson(_) | IngestError::InvalidShape(_) => {
                StatusCode::BAD_REQUEST
            }
            IngestError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

// ============ POST /active_tab ============

#[derive(Serialize)]
struct AckResponse {
    success: bool,
    message: String,
}

/// The body is taken as raw bytes so that a missing content type and bad
/// JSON map onto this API's error codes rather than axum's defaults.
async fn handle_active_tab(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AckResponse>, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.contains("application/json") {
        tracing::warn!(content_type, "rejected tab data: wrong content type");
        return Err(bad_request(
            "unsupported_content_type",
            "Content-Type must be application/json",
        ));
    }

    match ingest(state.store.as_ref(), &body).await {
        Ok(_) => Ok(Json(AckResponse {
            success: true,
            message: "Tab data received successfully".to_string(),
        })),
        Err(e) => {
            match &e {
                IngestError::StorageFailure(_) => {
                    tracing::error!(error = %e, "error storing tab data")
                }
                _ => tracing::warn!(code = e.code(), error = %e, "rejected tab data"),
            }
            Err(e.into())
        }
    }
}

// ============ GET /tabs ============

/// `tabs` is empty and the other fields are null when nothing has been
/// stored yet or the latest capture is unreadable.
#[derive(Serialize)]
struct TabsResponse {
    timestamp: Option<String>,
    #[serde(rename = "dataType")]
    data_type: Option<String>,
    tabs: Vec<TabRecord>,
}

impl From<Option<TabSnapshot>> for TabsResponse {
    fn from(snapshot: Option<TabSnapshot>) -> Self {
        match snapshot {
            Some(s) => TabsResponse {
                timestamp: Some(s.timestamp),
                data_type: Some(s.data_type.as_str().to_string()),
                tabs: s.tabs,
            },
            None => TabsResponse {
                timestamp: None,
                data_type: None,
                tabs: Vec::new(),
            },
        }
    }
}

async fn handle_tabs(State(state): State<AppState>) -> Json<TabsResponse> {
    Json(latest_snapshot(state.store.as_ref()).await.into())
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    matched: Option<TabRecord>,
    answer: Option<String>,
}

/// Raw bytes for the same reason as `/active_tab`: every rejection uses the
/// JSON error body.
async fn handle_ask(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AskResponse>, AppError> {
    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| bad_request("malformed_json", format!("Invalid JSON: {}", e)))?;
    let req: AskRequest = serde_json::from_value(value)
        .map_err(|e| bad_request("invalid_shape", format!("Invalid ask request: {}", e)))?;

    if req.question.trim().is_empty() {
        return Err(bad_request("invalid_shape", "question must not be empty"));
    }

    let tabs = crate::retrieve::list_tabs(state.store.as_ref()).await;
    let Some(tab) = match_tab(&req.question, &tabs) else {
        return Ok(Json(AskResponse {
            matched: None,
            answer: None,
        }));
    };

    let text = answer(&req.question, tab);
    state
        .history
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .push(req.question.clone(), text.clone());

    Ok(Json(AskResponse {
        matched: Some(tab.clone()),
        answer: Some(text),
    }))
}

// ============ GET /history ============

#[derive(Serialize)]
struct HistoryResponse {
    entries: Vec<ChatEntry>,
}

async fn handle_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    let entries = state
        .history
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .entries();
    Json(HistoryResponse { entries })
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
