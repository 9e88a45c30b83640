//! Bearer token extraction middleware.
//!
//! The relay does not validate tokens itself; upstream does. This layer only
//! requires `Authorization: Bearer <token>` to be present and hands the token
//! to handlers as a `BearerToken` extension.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::BearerToken;

/// Require a bearer token on the request.
pub async fn require_bearer(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_bearer_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_bearer_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers()).ok_or_else(|| {
        tracing::warn!(path = %req.uri().path(), "Authorization token is missing from request headers");
        ApiError::Unauthorized
    })?;

    req.extensions_mut().insert(BearerToken(token));
    Ok(next.run(req).await)
}

/// The token after `Bearer `, if present and non-empty.
pub fn extract_bearer(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
