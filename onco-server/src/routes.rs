//! Request handlers for the search API.

use axum::Json;
use axum::extract::State;
use onco_rag::ChunkMatch;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::AppState;
use crate::error::ApiError;

/// Body of `POST /api/search`.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Free-text query.
    pub query: String,
    /// Number of results to return (1..=50). Defaults to the configured
    /// value when omitted.
    pub top_k: Option<usize>,
}

/// Response of `POST /api/search`.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub top_k: usize,
    pub results: Vec<ChunkMatch>,
}

/// Execute an ANN search against the configured store.
pub async fn search(
    State(state): State<AppState>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let top_k = payload.top_k.unwrap_or(state.default_top_k);
    debug!(query = %payload.query, top_k, "search request");

    let results = state.search.search(&payload.query, top_k).await?;

    Ok(Json(SearchResponse { query: payload.query, top_k, results }))
}

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
