//! GET /api/v1/stats - record and embedding counts.

use std::time::Instant;

use axum::extract::State;
use axum::Json;

use crate::cli::status::{gather, StatusSummary};
use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<StatusSummary>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let summary = gather(&state).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(summary, request_id, elapsed)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::seeded_state;

    #[tokio::test]
    async fn test_stats() {
        let (_dir, state) = seeded_state().await;

        let Json(resp) = get_stats(State(state)).await.unwrap();

        let summary = resp.data.unwrap();
        assert_eq!(summary.records, 3);
        assert_eq!(summary.embeddings, 3);
        assert_eq!(summary.missing_embeddings, 0);
    }
}
