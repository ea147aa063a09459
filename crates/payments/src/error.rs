//! Payment error types.

use std::fmt;

use gateway::GatewayError;
use store::StoreError;
use thiserror::Error;

/// Caller-facing classification of a [`PaymentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the payment services.
///
/// Every message is safe to show to the caller. Underlying store, cache and
/// gateway errors are logged where they are converted and never carried here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// A business rule rejected the request.
    #[error("{0}")]
    BadRequest(String),

    /// The caller does not own the resource.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// The request collides with existing state.
    #[error("{0}")]
    Conflict(String),

    /// A dependency failed or returned unusable data.
    #[error("{0}")]
    Internal(String),
}

impl PaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::BadRequest(_) => ErrorKind::BadRequest,
            PaymentError::Forbidden(_) => ErrorKind::Forbidden,
            PaymentError::NotFound(_) => ErrorKind::NotFound,
            PaymentError::Conflict(_) => ErrorKind::Conflict,
            PaymentError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PaymentError::BadRequest(m)
            | PaymentError::Forbidden(m)
            | PaymentError::NotFound(m)
            | PaymentError::Conflict(m)
            | PaymentError::Internal(m) => m,
        }
    }

    /// Logs `cause` and returns an `Internal` error carrying only `message`.
    pub fn internal(message: &str, cause: impl fmt::Display) -> Self {
        tracing::error!(error = %cause, "{message}");
        PaymentError::Internal(message.to_string())
    }
}

impl From<StoreError> for PaymentError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate { entity, .. } => {
                PaymentError::Conflict(format!("{entity} already exists"))
            }
            StoreError::NotFound { entity, .. } => {
                PaymentError::NotFound(format!("{entity} not found"))
            }
            other => PaymentError::internal("storage unavailable", other),
        }
    }
}

impl From<GatewayError> for PaymentError {
    fn from(e: GatewayError) -> Self {
        PaymentError::internal("payment gateway request failed", e)
    }
}

/// Convenience type alias for payment results.
pub type Result<T> = std::result::Result<T, PaymentError>;
