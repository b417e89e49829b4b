//! API error types and JSON error response formatting.
//!
//! ApiError maps chat and storage failures to HTTP status codes with a
//! consistent `{error, message, details}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use releasebot_chat::ChatError;
use releasebot_core::ReleasebotError;
use serde::Serialize;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request").
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub enum ApiError {
    /// 400 with an optional list of validation problems.
    BadRequest(String, Option<Vec<String>>),
    /// 429 - too many requests.
    TooManyRequests(String),
    /// 500 Internal Server Error.
    Internal(String),
    /// 503 - chat disabled.
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into(), None)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg, details) => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                msg,
                details.map(|d| serde_json::json!(d)),
            ),
            ApiError::TooManyRequests(msg) => {
                (StatusCode::TOO_MANY_REQUESTS, "too_many_requests", msg, None)
            }
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg, None)
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg, None)
            }
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Disabled => ApiError::ServiceUnavailable(err.to_string()),
            ChatError::EmptyMessage | ChatError::MessageTooLong(_) => {
                ApiError::bad_request(err.to_string())
            }
            ChatError::InvalidContact(errors) => {
                ApiError::BadRequest("Invalid contact information".to_string(), Some(errors))
            }
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<ReleasebotError> for ApiError {
    fn from(err: ReleasebotError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
