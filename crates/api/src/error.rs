//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reservation::ReserveError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Reservation workflow error.
    Reserve(ReserveError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Reserve(err) => reserve_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn reserve_error_to_response(err: ReserveError) -> (StatusCode, String) {
    match &err {
        ReserveError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        // Retryable contention and the permanent sold case both answer 409;
        // the body tells the client which one it hit.
        ReserveError::Conflict | ReserveError::AlreadySold(_) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        ReserveError::LockStore(_) | ReserveError::Store(_) => {
            tracing::error!(error = %err, "reservation infrastructure failure");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<ReserveError> for ApiError {
    fn from(err: ReserveError) -> Self {
        ApiError::Reserve(err)
    }
}
