//! Stand-in for the rewriting service.
//!
//! Implements the same HTTP contract as the real backend (`/api/rewrite`,
//! `/api/rewrite-file`, `/api/health`) with a deterministic rewriter, plus
//! per-route knobs for delaying or failing replies and a log of every request
//! that reached a handler. Documents of every allowed type are read as UTF-8
//! text and split into paragraphs on blank lines.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub use axum::http::StatusCode;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["pdf", "docx", "txt", "md"];

/// Largest request body `/api/rewrite-file` accepts; larger uploads get 413.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const DEFAULT_TEMPERATURE: f64 = 0.5;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TextRewriteReply {
    pub success: bool,
    pub original_text: String,
    pub rewritten_text: String,
    pub original_length: usize,
    pub rewritten_length: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub index: usize,
    pub original: String,
    pub rewritten: String,
    pub original_length: usize,
    pub rewritten_length: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Statistics {
    pub total_original_length: usize,
    pub total_rewritten_length: usize,
    pub length_change: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FileRewriteReply {
    pub success: bool,
    pub filename: String,
    pub file_type: String,
    pub segments: Vec<Segment>,
    pub total_segments: usize,
    pub statistics: Statistics,
}

/// A canned non-2xx reply.
#[derive(Clone, Debug)]
pub struct Failure {
    pub status: StatusCode,
    pub body: String,
}

/// How one route behaves before its normal handling.
#[derive(Clone, Debug, Default)]
pub struct Behavior {
    pub delay: Duration,
    pub failure: Option<Failure>,
}

impl Behavior {
    pub fn delayed(delay: Duration) -> Self {
        Self { delay, failure: None }
    }

    pub fn failing(status: StatusCode, body: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            failure: Some(Failure {
                status,
                body: body.to_string(),
            }),
        }
    }

    /// Never replies within any reasonable test window.
    pub fn stalled() -> Self {
        Self::delayed(Duration::from_secs(3600))
    }
}

#[derive(Clone, Debug, Default)]
pub struct MockConfig {
    pub rewrite: Behavior,
    pub rewrite_file: Behavior,
    pub health: Behavior,
}

/// A request as seen by a handler.
#[derive(Clone, Debug, Serialize)]
pub struct RecordedRequest {
    pub path: String,
    pub content_type: Option<String>,
    pub request_id: Option<Uuid>,
    /// Decoded body fields. JSON bodies are kept as sent; multipart text
    /// fields are kept as strings; the file part is summarized as
    /// `file_name` and `file_size`.
    pub fields: BTreeMap<String, Value>,
}

/// Shared log of every request that reached a handler.
#[derive(Clone, Debug, Default)]
pub struct RequestLog(Arc<RwLock<Vec<RecordedRequest>>>);

impl RequestLog {
    pub async fn all(&self) -> Vec<RecordedRequest> {
        self.0.read().await.clone()
    }

    pub async fn for_path(&self, path: &str) -> Vec<RecordedRequest> {
        self.0
            .read()
            .await
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    async fn push(&self, request: RecordedRequest) {
        self.0.write().await.push(request);
    }
}

#[derive(Clone)]
struct AppState {
    config: Arc<MockConfig>,
    log: RequestLog,
}

pub fn app() -> Router {
    app_with(MockConfig::default(), RequestLog::default())
}

pub fn app_with(config: MockConfig, log: RequestLog) -> Router {
    let state = AppState {
        config: Arc::new(config),
        log,
    };
    Router::new()
        .route("/", get(index))
        .route("/api/rewrite", post(rewrite_text))
        .route(
            "/api/rewrite-file",
            post(rewrite_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/health", get(health))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, config: MockConfig, log: RequestLog) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config, log)).await
}

/// Deterministic rewrite: whitespace is normalized and the result is tagged
/// so callers can tell it apart from the input.
pub fn rewrite_paragraph(text: &str, use_knowledge_base: bool) -> String {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let tag = if use_knowledge_base { "rewritten+kb" } else { "rewritten" };
    format!("[{tag}] {normalized}")
}

pub fn allowed_file(filename: &str) -> bool {
    file_extension(filename).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

fn file_extension(filename: &str) -> Option<String> {
    filename.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
}

fn reject(status: StatusCode, message: impl Into<String>) -> Response {
    let message: String = message.into();
    (status, Json(json!({ "success": false, "error": message }))).into_response()
}

fn request_meta(headers: &HeaderMap) -> (Option<String>, Option<Uuid>) {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let request_id = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    (content_type, request_id)
}

/// Apply a route's delay, then its canned failure if any.
async fn apply(behavior: &Behavior) -> Option<Response> {
    if !behavior.delay.is_zero() {
        tokio::time::sleep(behavior.delay).await;
    }
    behavior.failure.as_ref().map(|failure| {
        (
            failure.status,
            [(header::CONTENT_TYPE, "application/json")],
            failure.body.clone(),
        )
            .into_response()
    })
}

async fn index() -> Json<Value> {
    Json(json!({
        "message": "rewrite service (mock)",
        "endpoints": {
            "POST /api/rewrite": "rewrite inline text",
            "POST /api/rewrite-file": "rewrite an uploaded document",
            "GET /api/health": "health check"
        }
    }))
}

async fn health(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (content_type, request_id) = request_meta(&headers);
    state
        .log
        .push(RecordedRequest {
            path: "/api/health".to_string(),
            content_type,
            request_id,
            fields: BTreeMap::new(),
        })
        .await;
    if let Some(failure) = apply(&state.config.health).await {
        return failure;
    }
    Json(json!({
        "status": "ok",
        "service": "rewrite-mock",
        "version": "1.0.0"
    }))
    .into_response()
}

async fn rewrite_text(State(state): State<AppState>, headers: HeaderMap, Json(input): Json<Value>) -> Response {
    let (content_type, request_id) = request_meta(&headers);
    let fields: BTreeMap<String, Value> = match &input {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        _ => BTreeMap::new(),
    };
    state
        .log
        .push(RecordedRequest {
            path: "/api/rewrite".to_string(),
            content_type,
            request_id,
            fields,
        })
        .await;
    if let Some(failure) = apply(&state.config.rewrite).await {
        return failure;
    }

    let Some(text) = input.get("text").and_then(Value::as_str) else {
        return reject(StatusCode::BAD_REQUEST, "missing text to rewrite");
    };
    let original = text.trim();
    if original.is_empty() {
        return reject(StatusCode::BAD_REQUEST, "text must not be empty");
    }
    let use_knowledge_base = input
        .get("use_knowledge_base")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    let rewritten = rewrite_paragraph(original, use_knowledge_base);
    Json(TextRewriteReply {
        success: true,
        original_text: original.to_string(),
        original_length: original.chars().count(),
        rewritten_length: rewritten.chars().count(),
        rewritten_text: rewritten,
    })
    .into_response()
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

async fn rewrite_file(State(state): State<AppState>, headers: HeaderMap, mut multipart: Multipart) -> Response {
    let (content_type, request_id) = request_meta(&headers);
    let mut fields = BTreeMap::new();
    let mut upload = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return reject(e.status(), format!("malformed multipart body: {e}")),
        };
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = match field.bytes().await {
                Ok(bytes) => bytes.to_vec(),
                Err(e) => return reject(e.status(), format!("failed to read upload: {e}")),
            };
            fields.insert("file_name".to_string(), json!(file_name));
            fields.insert("file_size".to_string(), json!(bytes.len()));
            upload = Some(Upload { file_name, bytes });
        } else {
            match field.text().await {
                Ok(value) => {
                    fields.insert(name, Value::String(value));
                }
                Err(e) => return reject(e.status(), format!("failed to read field: {e}")),
            }
        }
    }

    state
        .log
        .push(RecordedRequest {
            path: "/api/rewrite-file".to_string(),
            content_type,
            request_id,
            fields: fields.clone(),
        })
        .await;
    if let Some(failure) = apply(&state.config.rewrite_file).await {
        return failure;
    }

    let Some(upload) = upload else {
        return reject(StatusCode::BAD_REQUEST, "no file uploaded");
    };
    if upload.file_name.is_empty() {
        return reject(StatusCode::BAD_REQUEST, "no file selected");
    }
    if !allowed_file(&upload.file_name) {
        return reject(
            StatusCode::BAD_REQUEST,
            format!("unsupported file type, allowed: {}", ALLOWED_EXTENSIONS.join(", ")),
        );
    }

    let temperature = match fields.get("temperature").and_then(Value::as_str) {
        None => DEFAULT_TEMPERATURE,
        Some(raw) => match raw.parse::<f64>() {
            Ok(t) => t,
            Err(_) => {
                return reject(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("file processing failed: invalid temperature {raw:?}"),
                )
            }
        },
    };
    let use_knowledge_base = fields
        .get("use_knowledge_base")
        .and_then(Value::as_str)
        .map(|raw| raw.eq_ignore_ascii_case("true"))
        .unwrap_or(true);
    tracing::debug!(file = %upload.file_name, temperature, use_knowledge_base, "rewriting upload");

    let content = String::from_utf8_lossy(&upload.bytes);
    let segments: Vec<Segment> = content
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .enumerate()
        .map(|(idx, paragraph)| {
            let rewritten = rewrite_paragraph(paragraph, use_knowledge_base);
            Segment {
                index: idx + 1,
                original: paragraph.to_string(),
                original_length: paragraph.chars().count(),
                rewritten_length: rewritten.chars().count(),
                rewritten,
            }
        })
        .collect();

    let total_original_length: usize = segments.iter().map(|s| s.original_length).sum();
    let total_rewritten_length: usize = segments.iter().map(|s| s.rewritten_length).sum();
    let file_type = file_extension(&upload.file_name).unwrap_or_default();

    Json(FileRewriteReply {
        success: true,
        filename: upload.file_name,
        file_type,
        total_segments: segments.len(),
        segments,
        statistics: Statistics {
            total_original_length,
            total_rewritten_length,
            length_change: total_rewritten_length as i64 - total_original_length as i64,
        },
    })
    .into_response()
}
