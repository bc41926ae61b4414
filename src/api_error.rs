use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Structured errors surfaced by the ledger core and mapped onto HTTP
/// responses at the settlement API boundary. Every response body carries a
/// `retryable` flag so callers can tell "nothing happened, try again" apart
/// from "funds may have moved, do not retry".
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Internal server error")]
    InternalServerError,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: i64, requested: i64 },

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Transfer outcome unknown: {0}")]
    TransferAmbiguous(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::Conflict(msg.into())
    }

    pub fn insufficient_balance(available: i64, requested: i64) -> Self {
        ApiError::InsufficientBalance {
            available,
            requested,
        }
    }

    /// Whether the request can be safely re-issued by the caller. False for
    /// ambiguous transfers (a retry risks a duplicate payout) and for
    /// idempotency-key conflicts on in-flight attempts.
    pub fn retryable(&self) -> bool {
        match self {
            ApiError::BadRequest(_)
            | ApiError::NotFound(_)
            | ApiError::InsufficientBalance { .. }
            | ApiError::TransferFailed(_)
            | ApiError::DatabaseError(_)
            | ApiError::ValidationError(_) => true,
            ApiError::InternalServerError
            | ApiError::Conflict(_)
            | ApiError::TransferAmbiguous(_) => false,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
    retryable: bool,
    details: Option<String>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::InsufficientBalance { .. } => StatusCode::CONFLICT,
            ApiError::TransferFailed(_) | ApiError::TransferAmbiguous(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = match self {
            // Do not leak query details to clients.
            ApiError::DatabaseError(_) => "Database error".to_string(),
            _ => self.to_string(),
        };

        let error_response = ErrorResponse {
            error: message,
            code: status.as_u16(),
            retryable: self.retryable(),
            details: Some(self.to_string()),
        };

        HttpResponse::build(status).json(error_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::not_found("x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::insufficient_balance(50, 100).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::TransferFailed("rpc down".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::TransferAmbiguous("timeout".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_retryable_distinguishes_ambiguous_from_failed() {
        // Explicit failure means no funds moved; safe to retry.
        assert!(ApiError::TransferFailed("rejected".into()).retryable());
        // Ambiguous outcome may have moved funds; a retry risks double payout.
        assert!(!ApiError::TransferAmbiguous("timeout".into()).retryable());
    }

    #[test]
    fn test_no_effect_errors_are_retryable() {
        assert!(ApiError::bad_request("bad wallet").retryable());
        assert!(ApiError::insufficient_balance(0, 1).retryable());
        assert!(!ApiError::conflict("attempt in flight").retryable());
    }

    #[test]
    fn test_insufficient_balance_message() {
        let err = ApiError::insufficient_balance(500, 700);
        assert_eq!(
            err.to_string(),
            "Insufficient balance: available 500, requested 700"
        );
    }
}
