//! HTTP API for the coordinator
//!
//! - `GET  /health`                     liveness probe
//! - `POST /nodes/:node_id/heartbeat`   datanode heartbeat
//! - `GET  /nodes`                      tracked datanodes and their state
//! - `POST /files`                      split a file and assign its blocks
//! - `GET  /files`                      known file names
//! - `GET  /files/*filename`            stored layout of one file
//!
//! Every handler that touches the state runs on the blocking pool: an
//! assignment holds the state lock while it writes the snapshot to disk,
//! and runtime workers must not park on that lock.

use crate::common::{request_tracing_middleware, Error, Result};
use crate::coordinator::splitter::UNKNOWN_FILE;
use crate::coordinator::state::{lock, FileAssignment, FileInfo, SharedState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::limit::RequestBodyLimitLayer;

const MAX_REQUEST_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct CoordState {
    pub state: SharedState,
}

/// Request body for `POST /files`
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    #[serde(default)]
    pub filename: Option<String>,
    /// Negative sizes are treated like an empty file.
    pub filesize_bytes: i64,
}

pub fn create_router(state: CoordState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/nodes", get(list_nodes))
        .route("/nodes/:node_id/heartbeat", post(heartbeat))
        .route("/files", post(upload_file).get(list_files))
        .route("/files/*filename", get(file_info))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BYTES))
        .layer(middleware::from_fn(request_tracing_middleware))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Records the heartbeat at the coordinator's receive time and echoes the
/// payload back. The payload timestamp is informational only.
async fn heartbeat(
    State(state): State<CoordState>,
    Path(node_id): Path<String>,
    Json(payload): Json<Value>,
) -> Response {
    if let Some(claimed) = payload.get("node_id").and_then(Value::as_str) {
        if claimed != node_id {
            tracing::warn!(node_id = %node_id, claimed, "Heartbeat payload names a different node");
        }
    }
    let shared = state.state.clone();
    let id = node_id.clone();
    let outcome = match blocking(move || {
        let outcome = lock(&shared).record_heartbeat(&id, Utc::now());
        Ok(outcome)
    })
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => return error_response(&e),
    };
    tracing::debug!(node_id = %node_id, ?outcome, payload = %payload, "Heartbeat received");

    Json(json!({ "received_from": node_id, "payload": payload })).into_response()
}

async fn list_nodes(State(state): State<CoordState>) -> Response {
    let shared = state.state.clone();
    let result = blocking(move || {
        let nodes = lock(&shared).node_states(Utc::now());
        Ok(nodes)
    })
    .await;
    match result {
        Ok(nodes) => Json(json!({ "nodes": nodes })).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn upload_file(
    State(state): State<CoordState>,
    Json(req): Json<UploadRequest>,
) -> Response {
    let filename = req
        .filename
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_FILE.to_string());
    let file_size = u64::try_from(req.filesize_bytes).unwrap_or(0);

    let shared = state.state.clone();
    let result: Result<FileAssignment> = blocking(move || {
        let assignment = lock(&shared).assign(&filename, file_size, Utc::now());
        assignment
    })
    .await;

    match result {
        Ok(assignment) => (StatusCode::OK, Json(assignment)).into_response(),
        Err(e) => (
            e.to_http_status(),
            Json(json!({ "blocks": [], "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn list_files(State(state): State<CoordState>) -> Response {
    let shared = state.state.clone();
    let result = blocking(move || {
        let files = lock(&shared).filenames();
        Ok(files)
    })
    .await;
    match result {
        Ok(files) => Json(json!({ "files": files })).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn file_info(State(state): State<CoordState>, Path(filename): Path<String>) -> Response {
    let shared = state.state.clone();
    let result: Result<FileInfo> = blocking(move || {
        let info = lock(&shared).file_info(&filename);
        info
    })
    .await;
    match result {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => error_response(&e),
    }
}

fn error_response(e: &Error) -> Response {
    (e.to_http_status(), Json(json!({ "error": e.to_string() }))).into_response()
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("blocking task failed: {}", e)))?
}
