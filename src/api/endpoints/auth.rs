//! Login relay.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::AuthToken;

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: Option<String>,
}

/// Read the optional client password. Anything that is not a JSON object
/// with a string `password` counts as "no password".
pub fn parse_login_request(body: &[u8]) -> LoginRequest {
    if body.is_empty() {
        return LoginRequest::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Ignoring unparseable login body");
        LoginRequest::default()
    })
}

/// `POST /api/auth/login`: exchange the configured credentials for a token.
pub async fn login(
    State(ctx): State<ApiContext>,
    body: Bytes,
) -> Result<Json<AuthToken>, ApiError> {
    let request = parse_login_request(&body);
    let token = ctx.upstream.login(request.password.as_deref()).await?;
    Ok(Json(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_garbage_bodies_mean_no_password() {
        assert!(parse_login_request(b"").password.is_none());
        assert!(parse_login_request(b"not json").password.is_none());
        assert!(parse_login_request(b"[1,2]").password.is_none());
        assert!(parse_login_request(b"{}").password.is_none());
    }

    #[test]
    fn password_is_read() {
        let req = parse_login_request(br#"{"password":"hunter2"}"#);
        assert_eq!(req.password.as_deref(), Some("hunter2"));
    }
}
