//! Gateway error types with numeric error codes.
//!
//! Every error body has the shape `{"error":{"code":N,"message":"..."}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use qc_18_siwe_auth::{AuthError, RejectionReason};
use serde::Serialize;

/// Error codes carried in the response body
pub mod codes {
    // Request errors
    pub const INVALID_BODY: i32 = 1000;

    // Sign-in rejections, one per reason
    pub const MALFORMED_MESSAGE: i32 = 1101;
    pub const BAD_SIGNATURE: i32 = 1102;
    pub const ADDRESS_MISMATCH: i32 = 1103;
    pub const DOMAIN_MISMATCH: i32 = 1104;
    pub const NONCE_MISMATCH: i32 = 1105;
    pub const UNKNOWN_NONCE: i32 = 1106;
    pub const NONCE_REPLAY: i32 = 1107;
    pub const CHAIN_MISMATCH: i32 = 1108;
    pub const NOT_YET_VALID: i32 = 1109;
    pub const EXPIRED: i32 = 1110;

    // Infrastructure
    pub const STORE_UNAVAILABLE: i32 = 1500;
    pub const NONCE_EXHAUSTED: i32 = 1501;
}

/// Gateway error with HTTP status and body code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status
    pub status: StatusCode,
    /// Body error code
    pub code: i32,
    /// Error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, code: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Request body is not the expected JSON
    pub fn invalid_body(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_BODY,
            format!("Invalid request body: {}", details.into()),
        )
    }

    /// Sign-in was refused
    pub fn rejected(reason: &RejectionReason) -> Self {
        let code = match reason {
            RejectionReason::Malformed(_) => codes::MALFORMED_MESSAGE,
            RejectionReason::BadSignature(_) => codes::BAD_SIGNATURE,
            RejectionReason::AddressMismatch { .. } => codes::ADDRESS_MISMATCH,
            RejectionReason::DomainMismatch { .. } => codes::DOMAIN_MISMATCH,
            RejectionReason::NonceMismatch => codes::NONCE_MISMATCH,
            RejectionReason::UnknownNonce => codes::UNKNOWN_NONCE,
            RejectionReason::NonceReplay => codes::NONCE_REPLAY,
            RejectionReason::ChainMismatch { .. } => codes::CHAIN_MISMATCH,
            RejectionReason::NotYetValid { .. } => codes::NOT_YET_VALID,
            RejectionReason::Expired { .. } => codes::EXPIRED,
        };
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, code, reason.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let code = match err {
            AuthError::StoreUnavailable(_) => codes::STORE_UNAVAILABLE,
            AuthError::NonceCollision { .. } => codes::NONCE_EXHAUSTED,
        };
        Self::new(StatusCode::SERVICE_UNAVAILABLE, code, err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: i32,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: &self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}
