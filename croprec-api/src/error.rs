//! Error types for croprec-api

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Body is not valid JSON, or a field is missing or mistyped (422)
    #[error("Unprocessable request: {0}")]
    UnprocessableEntity(String),

    /// Request rejected before the body was read (e.g. 415 without a JSON content type)
    #[error("Request rejected: {1}")]
    Rejected(StatusCode, String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match &rejection {
            JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                ApiError::UnprocessableEntity(rejection.body_text())
            }
            _ => ApiError::Rejected(rejection.status(), rejection.body_text()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Rejected(status, _) => *status,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

/// SCREAMING_SNAKE form of the status reason, e.g. `UNSUPPORTED_MEDIA_TYPE`
fn error_code(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("ERROR")
        .to_uppercase()
        .replace([' ', '-'], "_")
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::UnprocessableEntity(msg)
            | ApiError::Rejected(_, msg)
            | ApiError::NotFound(msg) => msg,
        };

        let body = Json(json!({
            "error": {
                "code": error_code(status),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
