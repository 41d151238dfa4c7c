use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::pipeline::export::ExportError;
use crate::pipeline::PipelineError;
use crate::source::SourceError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Backend error: {0}")]
    Backend(#[from] SourceError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Pipeline(e) => (StatusCode::BAD_REQUEST, "INVALID_VIEW", e.to_string()),
            AppError::Export(e @ (ExportError::Json(_) | ExportError::Csv(_))) => {
                tracing::error!("Export encoding error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EXPORT_ERROR",
                    "The export could not be encoded".to_string(),
                )
            }
            AppError::Export(e) => (StatusCode::BAD_REQUEST, "INVALID_EXPORT", e.to_string()),
            AppError::Backend(e) => match e.status() {
                // Client errors from the backend are the caller's to see
                Some(status) if (400..500).contains(&status) && status != 429 => (
                    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST),
                    "BACKEND_REJECTED",
                    e.to_string(),
                ),
                _ => {
                    tracing::error!("Backend error: {e}");
                    (
                        StatusCode::BAD_GATEWAY,
                        "BAD_GATEWAY",
                        "The backend service is unavailable".to_string(),
                    )
                }
            },
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}
