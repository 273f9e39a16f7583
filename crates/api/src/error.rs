//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No authenticated user for an owner-scoped operation.
    Unauthorized,
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client; `field` names the offending field when
    /// the failure is a single-field validation error.
    BadRequest {
        field: Option<&'static str>,
        message: String,
    },
    /// Uniqueness conflict: a taken seat or a duplicate name. The caller
    /// must pick a different value, not merely one in range.
    Conflict(String),
    /// Internal server error.
    Internal(String),
}

impl ApiError {
    /// Convenience constructor for a field-less bad request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            field: None,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, field, message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                None,
                "authentication required".to_string(),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, None, msg),
            ApiError::BadRequest { field, message } => (StatusCode::BAD_REQUEST, field, message),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, None, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, None, msg)
            }
        };

        let body = match field {
            Some(field) => serde_json::json!({ "error": message, "field": field }),
            None => serde_json::json!({ "error": message }),
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StoreError::SeatTaken { .. } => {
                metrics::counter!("seat_conflicts_total").increment(1);
                ApiError::Conflict(err.to_string())
            }
            StoreError::DuplicateName { .. } => ApiError::Conflict(err.to_string()),
            StoreError::InvalidCredentials => ApiError::Unauthorized,
            StoreError::Validation(domain_err) => ApiError::BadRequest {
                field: domain_err.field(),
                message: domain_err.to_string(),
            },
            StoreError::Database(_) | StoreError::Migration(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}
