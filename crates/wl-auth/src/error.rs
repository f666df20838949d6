//! Auth Core Error Taxonomy
//!
//! One error enum for the whole core, rendered to a single information-free
//! JSON envelope at the HTTP boundary. Internal causes are logged with a
//! correlation id and never leaked to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("refresh rejected")]
    RefreshRejected,

    #[error("handoff code invalid or expired")]
    HandoffInvalid,

    #[error("unauthorized")]
    Unauthorized,

    #[error("malformed request")]
    Malformed,

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("origin rejected")]
    OriginRejected,

    #[error("internal error")]
    Internal {
        /// Logged at the error site; never serialized to the client.
        message: String,
    },

    #[error("identity store unavailable")]
    Unavailable,
}

impl AuthError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}

/// Uniform error envelope. Never names which internal check failed.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Internal { message } = &self {
            let correlation_id = Uuid::new_v4();
            error!(%correlation_id, %message, "internal auth error");
            let body = ErrorBody {
                error: "INTERNAL_ERROR".to_string(),
                message: correlation_id.to_string(),
            };
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
        }

        let (status, code) = match &self {
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AuthError::RefreshRejected => (StatusCode::UNAUTHORIZED, "REFRESH_REJECTED"),
            AuthError::HandoffInvalid => (StatusCode::UNAUTHORIZED, "HANDOFF_INVALID"),
            AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AuthError::Malformed => (StatusCode::BAD_REQUEST, "MALFORMED"),
            AuthError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            AuthError::OriginRejected => (StatusCode::FORBIDDEN, "ORIGIN_REJECTED"),
            AuthError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
            AuthError::Internal { .. } => unreachable!("handled above"),
        };

        let body = ErrorBody {
            error: code.to_string(),
            message: self.to_string(),
        };

        let mut response = (status, Json(body)).into_response();
        if let AuthError::RateLimited { retry_after_secs } = &self {
            if let Ok(value) = retry_after_secs.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
