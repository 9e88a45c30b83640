//! API error types with JSON `{message, code}` responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::upstream::UpstreamError;

/// Error response body for dashboard clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: &'static str,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authorization token is missing.")]
    Unauthorized,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    /// Upstream answered non-2xx; its status is relayed.
    #[error("Upstream error {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("Bad gateway: {0}")]
    BadGateway(String),
    #[error("Upstream unreachable: {0}")]
    Unreachable(String),
    #[error("Server configuration error: {0}")]
    Configuration(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Status, machine code and client-facing message.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authorization token is missing.".to_string(),
            ),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::Upstream { status, message } => (
                relayed_status(*status),
                "UPSTREAM_ERROR",
                message.clone(),
            ),
            ApiError::BadGateway(detail) => {
                (StatusCode::BAD_GATEWAY, "MALFORMED_UPSTREAM", detail.clone())
            }
            ApiError::Unreachable(hint) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "UPSTREAM_UNREACHABLE",
                hint.clone(),
            ),
            ApiError::Configuration(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG",
                format!("Server configuration error: {detail}"),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        }
    }
}

/// Relay upstream error statuses as-is; anything that is not an error
/// status becomes 502.
fn relayed_status(status: u16) -> StatusCode {
    match StatusCode::from_u16(status) {
        Ok(code) if code.is_client_error() || code.is_server_error() => code,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        (status, Json(ErrorBody { message, code })).into_response()
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Unreachable(hint) => ApiError::Unreachable(hint),
            UpstreamError::Status { status, message } => ApiError::Upstream { status, message },
            UpstreamError::Malformed(detail) => ApiError::BadGateway(detail),
            UpstreamError::Config(detail) => ApiError::Configuration(detail),
        }
    }
}
