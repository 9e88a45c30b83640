//! Shared types for the relay API layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::models::Case;
use crate::upstream::UpstreamClient;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub upstream: UpstreamClient,
}

impl ApiContext {
    pub fn new(upstream: UpstreamClient) -> Self {
        Self { upstream }
    }
}

/// Bearer token forwarded from the dashboard, injected into request
/// extensions by the auth middleware.
#[derive(Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Never print the token itself.
impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BearerToken({})", crate::models::token_preview(&self.0))
    }
}

/// Result of a case update, rendered the same way for every failure mode:
/// `{success: true, updatedCase}` or `{success: false, message}`.
#[derive(Debug)]
pub enum UpdateOutcome {
    Updated(Box<Case>),
    Failed(ApiError),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSuccessBody {
    success: bool,
    updated_case: Case,
}

#[derive(Serialize)]
struct UpdateFailureBody {
    success: bool,
    message: String,
    code: &'static str,
}

impl From<Result<Case, ApiError>> for UpdateOutcome {
    fn from(result: Result<Case, ApiError>) -> Self {
        match result {
            Ok(case) => UpdateOutcome::Updated(Box::new(case)),
            Err(err) => UpdateOutcome::Failed(err),
        }
    }
}

impl IntoResponse for UpdateOutcome {
    fn into_response(self) -> Response {
        match self {
            UpdateOutcome::Updated(case) => (
                StatusCode::OK,
                Json(UpdateSuccessBody {
                    success: true,
                    updated_case: *case,
                }),
            )
                .into_response(),
            UpdateOutcome::Failed(err) => {
                let (status, code, message) = err.parts();
                (
                    status,
                    Json(UpdateFailureBody {
                        success: false,
                        message,
                        code,
                    }),
                )
                    .into_response()
            }
        }
    }
}
