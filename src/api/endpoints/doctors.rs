//! Doctor list proxy.

use axum::extract::State;
use axum::http::header::CACHE_CONTROL;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, BearerToken};

/// Edge-cache policy for the doctor list. Only sent on success.
pub const DOCTORS_CACHE_CONTROL: &str = "public, s-maxage=300, stale-while-revalidate=3600";

/// `GET /api/doctors`: upstream doctors minus test practices.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(token): Extension<BearerToken>,
) -> Result<Response, ApiError> {
    let doctors = ctx.upstream.fetch_doctors(token.as_str()).await?;
    Ok(([(CACHE_CONTROL, DOCTORS_CACHE_CONTROL)], Json(doctors)).into_response())
}
