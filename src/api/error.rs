//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::chat::ChatError;
use crate::core_state::CoreError;
use crate::inference::InferenceError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        details: Option<Value>,
    },
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("Language model unavailable: {0}")]
    LlmUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail, None),
            ApiError::NotFound { message, details } => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", message, details)
            }
            ApiError::ModelUnavailable(detail) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "MODEL_UNAVAILABLE",
                format!("{detail}. Train and export the models, then restart the server."),
                None,
            ),
            ApiError::LlmUnavailable(detail) => {
                tracing::warn!(detail, "Chatbot backend unavailable");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_UNAVAILABLE",
                    "Failed to generate response".to_string(),
                    Some(Value::String(detail)),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::ModelNotLoaded(_) | InferenceError::MetadataUnavailable(_) => {
                ApiError::ModelUnavailable(err.to_string())
            }
            InferenceError::InvalidInput(detail) => ApiError::BadRequest(detail),
            InferenceError::Prediction(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage | ChatError::MessageTooLong { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            ChatError::Llm(e) => ApiError::LlmUnavailable(e.to_string()),
            ChatError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<crate::db::DatabaseError> for ApiError {
    fn from(err: crate::db::DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("background task failed: {err}"))
    }
}
