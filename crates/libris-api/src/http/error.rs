//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use libris_types::error::{QueryError, SearchError, StorageError};

use super::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Query(QueryError),
    Storage(StorageError),
    NotFound(String),
    Validation(String),
}

impl From<QueryError> for AppError {
    fn from(e: QueryError) -> Self {
        AppError::Query(e)
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::Storage(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Query(QueryError::EmptyQuery) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", "Query text is empty".to_string())
            }
            AppError::Query(QueryError::Provider(e)) => {
                (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", e.to_string())
            }
            AppError::Query(QueryError::Search(e @ SearchError::DimensionMismatch { .. })) => {
                (StatusCode::CONFLICT, "DIMENSION_MISMATCH", e.to_string())
            }
            AppError::Query(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", e.to_string())
            }
            AppError::Storage(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", e.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, "request failed: {message}");
        }
        let request_id = uuid::Uuid::now_v7().to_string();
        (status, Json(ApiResponse::error(code, &message, request_id, 0))).into_response()
    }
}
