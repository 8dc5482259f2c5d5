//! GET /api/v1/search?q=..&k=.. - rank records by similarity to free text.
//!
//! `k` above `MAX_K` is clamped to it.

use std::time::Instant;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use libris_types::embedding::QueryOutcome;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Largest `k` served over HTTP.
const MAX_K: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Query text.
    pub q: String,
    /// Number of results; the configured default when absent.
    pub k: Option<usize>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<ApiResponse<QueryOutcome>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let k = params
        .k
        .unwrap_or(state.config.search.default_limit)
        .min(MAX_K);

    let outcome = state.query_service.query(&params.q, k).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(outcome, request_id, elapsed)))
}
