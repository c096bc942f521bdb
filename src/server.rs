//! HTTP interface for chat clients.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/chat` | `{message}` → `{reply, kind, sources}` |
//! | `POST` | `/ingest` | Ingest the source directory, returns the report |
//! | `POST` | `/upload` | Multipart `files` saved into the source directory |
//!
//! `/chat` answers small talk from a fixed phrase table (`kind: "canned"`)
//! before searching the documents.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front end
//! served from another origin can call the API.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::app::App;
use crate::chat::canned_reply;
use crate::config::Config;
use crate::models::{IngestReport, SearchHit};

#[derive(Clone)]
struct AppState {
    app: Arc<App>,
    /// One ingestion run at a time per process.
    ingest_lock: Arc<Mutex<()>>,
}

/// Build the router for an opened [`App`].
pub fn router(app: Arc<App>) -> Router {
    let body_limit = usize::try_from(app.config.extraction.max_file_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(64 * 1024);

    let state = AppState {
        app,
        ingest_lock: Arc::new(Mutex::new(())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/chat", post(handle_chat))
        .route("/ingest", post(handle_ingest))
        .route("/upload", post(handle_upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Open the configured index and serve until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = Arc::new(App::open(config.clone()).await?);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "server listening");
    println!("Listening on http://{}", bind_addr);

    axum::serve(listener, router(app)).await?;
    Ok(())
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
        code: "bad_request".to_string(),
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

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
    /// `canned`, or the answer kind (`summary`, `retrieved`, `no_results`, `degraded`).
    kind: String,
    sources: Vec<SearchHit>,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let message = req.message.trim();

    if let Some(reply) = canned_reply(message) {
        return Ok(Json(ChatResponse {
            reply: reply.to_string(),
            kind: "canned".to_string(),
            sources: Vec::new(),
        }));
    }

    let answer = state
        .app
        .answer(message)
        .await
        .map_err(|e| bad_request(e.to_string()))?;

    Ok(Json(ChatResponse {
        reply: answer.text,
        kind: answer.kind.as_str().to_string(),
        sources: answer.sources,
    }))
}

// ============ POST /ingest ============

async fn handle_ingest(State(state): State<AppState>) -> Result<Json<IngestReport>, AppError> {
    let _guard = state.ingest_lock.lock().await;
    let report = state.app.ingest().await.map_err(|e| {
        tracing::error!(error = %e, "ingestion failed");
        internal(format!("{:#}", e))
    })?;
    Ok(Json(report))
}

// ============ POST /upload ============

#[derive(Serialize)]
struct UploadResponse {
    message: String,
    files: Vec<String>,
}

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let source_dir = state.app.config.paths.source_dir.clone();
    tokio::fs::create_dir_all(&source_dir)
        .await
        .map_err(|e| internal(format!("cannot create {}: {}", source_dir.display(), e)))?;

    let mut saved = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.to_string()))?
    {
        if field.name() != Some("files") {
            continue;
        }
        let Some(filename) = field.file_name().and_then(safe_filename) else {
            return Err(bad_request("uploaded file has no usable filename"));
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(e.to_string()))?;

        tokio::fs::write(source_dir.join(&filename), &bytes)
            .await
            .map_err(|e| internal(format!("cannot save {}: {}", filename, e)))?;
        tracing::info!(file = %filename, bytes = bytes.len(), "saved upload");
        saved.push(filename);
    }

    Ok(Json(UploadResponse {
        message: format!("Uploaded files: {:?}", saved),
        files: saved,
    }))
}

/// Strip any directory components a client put in the filename.
fn safe_filename(raw: &str) -> Option<String> {
    let name = Path::new(raw.trim()).file_name()?.to_string_lossy().to_string();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn test_app(dir: &Path) -> Arc<App> {
        let mut config = Config::default();
        config.paths.source_dir = dir.join("docs");
        config.index.dir = dir.join("index");
        std::fs::create_dir_all(&config.paths.source_dir).unwrap();
        Arc::new(App::open(config).await.unwrap())
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn chat_request(message: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "message": message }).to_string(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(test_app(dir.path()).await)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn chat_answers_small_talk() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(test_app(dir.path()).await)
            .oneshot(chat_request("hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["kind"], "canned");
        assert_eq!(body["reply"], "Hi there! How’s your day going?");
    }

    #[tokio::test]
    async fn chat_on_empty_index_has_no_results() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(test_app(dir.path()).await)
            .oneshot(chat_request("what does the contract say"))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["kind"], "no_results");
        assert_eq!(body["reply"], "Sorry, I found no results in the documents.");
    }

    #[tokio::test]
    async fn chat_rejects_empty_message() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(test_app(dir.path()).await)
            .oneshot(chat_request("   "))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn ingest_returns_report() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path()).await;
        std::fs::write(app.config.paths.source_dir.join("notes.txt"), b"x").unwrap();

        let response = router(app)
            .oneshot(Request::post("/ingest").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["processed"], 0);
        assert_eq!(body["ignored"], 1);
    }

    #[tokio::test]
    async fn upload_saves_into_source_dir() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path()).await;
        let source_dir = app.config.paths.source_dir.clone();

        let body = "--XBOUNDARY\r\n\
            Content-Disposition: form-data; name=\"files\"; filename=\"../report.pdf\"\r\n\
            Content-Type: application/pdf\r\n\r\n\
            %PDF-1.4 fake\r\n\
            --XBOUNDARY--\r\n";
        let request = Request::post("/upload")
            .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap();

        let response = router(app).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["files"][0], "report.pdf");
        assert_eq!(
            std::fs::read(source_dir.join("report.pdf")).unwrap(),
            b"%PDF-1.4 fake"
        );
    }

    #[test]
    fn filenames_lose_directories() {
        assert_eq!(safe_filename("a.pdf").as_deref(), Some("a.pdf"));
        assert_eq!(safe_filename("/etc/x/b.png").as_deref(), Some("b.png"));
        assert_eq!(safe_filename("..").as_deref(), None);
        assert_eq!(safe_filename("").as_deref(), None);
    }
}
