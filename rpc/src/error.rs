//! RPC error types and their HTTP rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use zkauth_types::ErrorKind;
use zkauth_verification::{ChallengeError, HandleError, StatusError};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Challenge(#[from] ChallengeError),

    #[error(transparent)]
    Handle(#[from] HandleError),

    #[error(transparent)]
    Status(#[from] StatusError),
}

/// Error body: `{"status": "error", "error": <kind>, "message": ..}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub error: String,
    pub message: String,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MalformedResponse => StatusCode::BAD_REQUEST,
        ErrorKind::ChallengeMismatch
        | ErrorKind::ProofRequirementUnmet
        | ErrorKind::StaleState => StatusCode::FORBIDDEN,
        ErrorKind::UnknownSession => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::KeyNotFound | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::UnresolvableState | ErrorKind::SchemaUnavailable => StatusCode::BAD_GATEWAY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl RpcError {
    /// HTTP status, error label and client-safe message.
    fn parts(&self) -> (StatusCode, String, String) {
        match self {
            Self::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "InvalidRequest".into(), msg.clone())
            }
            Self::Challenge(ChallengeError::Conflict(_)) => (
                StatusCode::CONFLICT,
                ErrorKind::Conflict.to_string(),
                "session already has a challenge".into(),
            ),
            Self::Challenge(ChallengeError::StoreFull(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Internal.to_string(),
                "too many open sessions".into(),
            ),
            Self::Challenge(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::Internal.to_string(),
                "could not issue challenge".into(),
            ),
            Self::Handle(e) => (status_for(e.kind()), e.kind().to_string(), e.public_message()),
            Self::Status(StatusError::UnknownSession(_)) => (
                StatusCode::NOT_FOUND,
                ErrorKind::UnknownSession.to_string(),
                "unknown or expired session".into(),
            ),
            Self::Status(StatusError::Store(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::Internal.to_string(),
                "internal error".into(),
            ),
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let (status, error, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        let body = ErrorBody {
            status: "error",
            error,
            message,
        };
        (status, Json(body)).into_response()
    }
}
