//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use payments::{ErrorKind, PaymentError};
use serde::Serialize;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request is missing the authenticated user.
    #[error("{0}")]
    Unauthorized(String),
    /// Malformed path, query or body value.
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    kind: &'a str,
    message: &'a str,
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.as_str()),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorKind::BadRequest.as_str(),
                msg.as_str(),
            ),
            ApiError::Payment(err) => (status_for(err.kind()), err.kind().as_str(), err.message()),
        };

        if status.is_server_error() {
            tracing::error!(%kind, %message, "request failed");
        }

        let body = ErrorBody { kind, message };
        (status, axum::Json(body)).into_response()
    }
}
