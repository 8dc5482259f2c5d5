//! GET /api/v1/records/{id} - one record with its embedding count.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;

use libris_core::repository::record::RecordRepository;
use libris_core::repository::vector::VectorRepository;
use libris_types::record::RecordId;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let id: RecordId = id
        .parse()
        .map_err(|_| AppError::Validation(format!("invalid record id '{id}'")))?;

    let record = state
        .records
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("record {id} not found")))?;
    let embeddings = state.vectors.count_for(id).await?;

    let mut data = serde_json::to_value(&record)
        .map_err(|e| AppError::Storage(libris_types::error::StorageError::Query(e.to_string())))?;
    data["embeddings"] = serde_json::json!(embeddings);

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/records/{id}"));

    Ok(Json(resp))
}
