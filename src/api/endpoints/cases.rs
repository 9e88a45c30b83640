//! Case aggregation and update relays.

use std::str::FromStr;

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde_json::{Map, Value};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, BearerToken, UpdateOutcome};
use crate::models::{Case, CaseFilter, CaseStatus};

/// Doctor account numbers from a `{doctorAccNos: [...]}` body.
///
/// `None` means no doctor filter: the body is missing or unparseable, or the
/// value is absent, not an array, or an empty array. A non-empty array is
/// always a filter, even when none of its entries are usable; numeric entries
/// are accepted as their decimal text and anything else is dropped.
pub fn parse_doctor_acc_nos(body: &[u8]) -> Option<Vec<String>> {
    let value = serde_json::from_slice::<Value>(body).ok()?;
    let items = value.get("doctorAccNos")?.as_array()?;
    if items.is_empty() {
        return None;
    }
    Some(
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
    )
}

/// `POST /api/cases`: aggregate normalized cases for the given doctors.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(token): Extension<BearerToken>,
    filter: Result<Query<CaseFilter>, QueryRejection>,
    body: Bytes,
) -> Result<Json<Vec<Case>>, ApiError> {
    let Query(filter) = filter.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let cases = match parse_doctor_acc_nos(&body) {
        None => {
            tracing::info!("Aggregating cases for all doctors");
            ctx.upstream.aggregate_cases(token.as_str(), &[]).await
        }
        Some(acc_nos) if acc_nos.is_empty() => {
            tracing::warn!("doctorAccNos held no usable account numbers");
            Vec::new()
        }
        Some(acc_nos) => {
            tracing::info!(doctors = acc_nos.len(), "Aggregating cases");
            ctx.upstream.aggregate_cases(token.as_str(), &acc_nos).await
        }
    };
    Ok(Json(filter.apply(cases)))
}

fn require_case_id(case_id: &str) -> Result<&str, ApiError> {
    let trimmed = case_id.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest("Case ID is missing from the path.".into()));
    }
    Ok(trimmed)
}

/// Pull an exact `NEW`/`PROCESSED` out of a `{case_status}` body.
pub fn parse_status_request(body: &[u8]) -> Result<CaseStatus, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| {
        ApiError::BadRequest("Invalid request body. Expected JSON with case_status.".into())
    })?;
    let Value::Object(map) = value else {
        return Err(ApiError::BadRequest(
            "Invalid request body. Expected JSON with case_status.".into(),
        ));
    };
    map.get("case_status")
        .and_then(Value::as_str)
        .and_then(|s| CaseStatus::from_str(s).ok())
        .ok_or_else(|| {
            ApiError::BadRequest(
                "Invalid case_status provided in request body. Must be NEW or PROCESSED.".into(),
            )
        })
}

pub fn parse_update_request(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(ApiError::BadRequest(
            "Invalid request body. Expected JSON with case data.".into(),
        )),
    }
}

/// `PUT /api/cases/:caseId/status`
pub async fn update_status(
    State(ctx): State<ApiContext>,
    Extension(token): Extension<BearerToken>,
    Path(case_id): Path<String>,
    body: Bytes,
) -> UpdateOutcome {
    let result = relay_status(&ctx, &token, &case_id, &body).await;
    log_failure(&case_id, &result);
    result.into()
}

async fn relay_status(
    ctx: &ApiContext,
    token: &BearerToken,
    case_id: &str,
    body: &[u8],
) -> Result<Case, ApiError> {
    let case_id = require_case_id(case_id)?;
    let status = parse_status_request(body)?;
    Ok(ctx
        .upstream
        .update_case_status(token.as_str(), case_id, status)
        .await?)
}

/// `PUT /api/cases/:caseId/update`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(token): Extension<BearerToken>,
    Path(case_id): Path<String>,
    body: Bytes,
) -> UpdateOutcome {
    let result = relay_update(&ctx, &token, &case_id, &body).await;
    log_failure(&case_id, &result);
    result.into()
}

async fn relay_update(
    ctx: &ApiContext,
    token: &BearerToken,
    case_id: &str,
    body: &[u8],
) -> Result<Case, ApiError> {
    let case_id = require_case_id(case_id)?;
    let changes = parse_update_request(body)?;
    Ok(ctx.upstream.update_case(token.as_str(), case_id, changes).await?)
}

fn log_failure(case_id: &str, result: &Result<Case, ApiError>) {
    if let Err(e) = result {
        tracing::warn!(case_id, error = %e, "Case update failed");
    }
}
