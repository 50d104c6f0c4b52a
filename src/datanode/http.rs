//! HTTP API for a datanode
//!
//! - `GET  /health`
//! - `POST /store_block`  body `{block_id, block_data}` with base64 data

use crate::common::{request_tracing_middleware, Error};
use crate::datanode::blob::BlockStore;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

#[derive(Clone)]
pub struct DataNodeState {
    pub store: Arc<BlockStore>,
    pub node_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreBlockRequest {
    pub block_id: String,
    /// Base64 (standard alphabet, padded)
    pub block_data: String,
}

pub fn create_router(state: DataNodeState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/store_block", post(store_block))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(middleware::from_fn(request_tracing_middleware))
        .with_state(state)
}

async fn health(State(state): State<DataNodeState>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "node_id": state.node_id }))
}

async fn store_block(
    State(state): State<DataNodeState>,
    Json(req): Json<StoreBlockRequest>,
) -> Response {
    let data = match STANDARD.decode(req.block_data.as_bytes()) {
        Ok(data) => data,
        Err(e) => return error_response(&Error::InvalidPayload(e.to_string())),
    };

    match state.store.put(&req.block_id, &data).await {
        Ok(()) => {
            tracing::info!(block_id = %req.block_id, size = data.len(), "Block stored");
            (
                StatusCode::OK,
                Json(json!({
                    "status": "stored",
                    "block_id": req.block_id,
                    "size": data.len(),
                })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(block_id = %req.block_id, "Failed to store block: {}", e);
            error_response(&e)
        }
    }
}

fn error_response(e: &Error) -> Response {
    (e.to_http_status(), Json(json!({ "error": e.to_string() }))).into_response()
}
