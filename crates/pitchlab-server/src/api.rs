//! Shared API error type for HTTP handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal server error: {error}")]
    InternalServerError {
        error: String,
        details: Option<String>,
    },
}

impl ApiError {
    /// Convenience for internal errors that carry a provider/parse detail.
    pub fn internal(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InternalServerError {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg, None),
            ApiError::InternalServerError { error, details } => {
                (StatusCode::INTERNAL_SERVER_ERROR, error, details)
            }
        };

        let mut body = serde_json::json!({ "error": error });
        if let Some(details) = details {
            body["details"] = serde_json::Value::String(details);
        }

        (status, Json(body)).into_response()
    }
}
