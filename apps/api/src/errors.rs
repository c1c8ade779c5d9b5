use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::{ErrorKind, GenerationError};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg.clone())
            }
            AppError::Generation(e) => match e.kind() {
                ErrorKind::InvalidInput => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                ErrorKind::Transport => {
                    tracing::error!("LLM transport error: {e}");
                    (
                        StatusCode::BAD_GATEWAY,
                        "LLM_TRANSPORT_ERROR",
                        "The AI service could not be reached".to_string(),
                    )
                }
                ErrorKind::ResponseParse => {
                    tracing::error!("LLM response error: {e}");
                    (
                        StatusCode::BAD_GATEWAY,
                        "LLM_RESPONSE_INVALID",
                        "The AI service returned an unreadable response".to_string(),
                    )
                }
                ErrorKind::SchemaViolation => {
                    tracing::error!("LLM schema violation: {e}");
                    (
                        StatusCode::BAD_GATEWAY,
                        "LLM_SCHEMA_VIOLATION",
                        "The AI service returned an incomplete response".to_string(),
                    )
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
