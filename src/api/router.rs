//! Relay API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. CORS → 2. Access log → 3. Bearer extraction (protected routes only)

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::upstream::UpstreamClient;

/// Build the relay router around an upstream client.
pub fn relay_router(upstream: UpstreamClient) -> Router {
    build_router(ApiContext::new(upstream))
}

fn build_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/doctors", get(endpoints::doctors::list))
        .route("/cases", post(endpoints::cases::list))
        .route("/cases/:case_id/status", put(endpoints::cases::update_status))
        .route("/cases/:case_id/update", put(endpoints::cases::update))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_bearer));

    let public = Router::new()
        .route("/auth/login", post(endpoints::auth::login))
        .route("/health", get(endpoints::health::check))
        .with_state(ctx);

    Router::new()
        .nest("/api", protected.merge(public))
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{spawn_upstream, test_config};
    use axum::body::Body;
    use axum::extract::Path;
    use axum::http::{HeaderMap, Request, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::Json;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn make_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn bearer_of(headers: &HeaderMap) -> String {
        headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    /// Stand-in for the billing API covering every resource the relay uses.
    fn fake_billing_api() -> Router {
        Router::new()
            .route(
                "/auth/login",
                axum::routing::post(|| async { Json(json!({"status": "success", "token": "upstream-jwt"})) }),
            )
            .route(
                "/doctors",
                get(|headers: HeaderMap| async move {
                    if bearer_of(&headers) != "Bearer upstream-jwt" {
                        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid token"})))
                            .into_response();
                    }
                    Json(json!({"status": "success", "doctors": [
                        {"id": "D1", "name": "Dr A", "practiceName": "Real Practice", "specialty": "Ortho"},
                        {"id": "D2", "name": "Dr T", "practiceName": "My Test Clinic", "specialty": "GP"}
                    ]}))
                    .into_response()
                }),
            )
            .route(
                "/cases",
                get(|| async {
                    Json(json!([
                        {"id": 10, "doctor_acc_no": "A1", "case_status": "NEW"},
                        {"id": 11, "doctor_acc_no": "B2", "case_status": "PROCESSED"}
                    ]))
                }),
            )
            .route(
                "/cases/submissions/doctors/:acc",
                get(|Path(acc): Path<String>| async move {
                    match acc.as_str() {
                        "A1" => Json(json!({"case_submissions": [
                            {"id": 1, "doctor_acc_no": "A1", "patient_name": "zoe Adams",
                             "service_date": "2024-05-01", "start_time": "10:00", "case_status": "PROCESSED"},
                            {"id": 2, "doctor_acc_no": "A1", "patient_name": "Bob Brown",
                             "service_date": "2024-05-02", "case_status": ""}
                        ]}))
                        .into_response(),
                        _ => (StatusCode::NOT_FOUND, "no cases").into_response(),
                    }
                }),
            )
            .route(
                "/cases/:id/status",
                put(|Path(id): Path<i64>, Json(body): Json<Value>| async move {
                    Json(json!({"case_submission": {"id": id, "case_status": body["case_status"]}}))
                }),
            )
            .route(
                "/cases/submissions/update/:id",
                put(|Path(id): Path<String>, Json(mut body): Json<Value>| async move {
                    if id == "404" {
                        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Case not found"})))
                            .into_response();
                    }
                    body["id"] = json!(id);
                    Json(json!({"status": "success", "data": body})).into_response()
                }),
            )
    }

    async fn relay() -> Router {
        let base = spawn_upstream(fake_billing_api()).await;
        relay_router(UpstreamClient::new(test_config(&base)).unwrap())
    }

    #[tokio::test]
    async fn health_needs_no_auth() {
        let app = relay().await;
        let response = app.oneshot(make_request("GET", "/api/health", None, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("X-Request-Id"));
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], crate::config::APP_VERSION);
    }

    #[tokio::test]
    async fn login_tolerates_missing_body() {
        let app = relay().await;
        let response = app.oneshot(make_request("POST", "/api/auth/login", None, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["token"], "upstream-jwt");
        assert!(json["expiresAt"].as_i64().unwrap() > chrono::Utc::now().timestamp_millis());
    }

    #[tokio::test]
    async fn protected_routes_require_bearer() {
        let app = relay().await;
        for (method, uri) in [
            ("GET", "/api/doctors"),
            ("POST", "/api/cases"),
            ("PUT", "/api/cases/1/status"),
            ("PUT", "/api/cases/1/update"),
        ] {
            let response = app
                .clone()
                .oneshot(make_request(method, uri, None, None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
            assert_eq!(body_json(response).await["message"], "Authorization token is missing.");
        }
    }

    #[tokio::test]
    async fn doctors_are_filtered_and_cacheable() {
        let app = relay().await;
        let response = app
            .oneshot(make_request("GET", "/api/doctors", Some("upstream-jwt"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("Cache-Control").unwrap(),
            endpoints::doctors::DOCTORS_CACHE_CONTROL
        );
        let json = body_json(response).await;
        let doctors = json.as_array().unwrap();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0]["id"], "D1");
    }

    #[tokio::test]
    async fn doctors_relay_upstream_rejection() {
        let app = relay().await;
        let response = app
            .oneshot(make_request("GET", "/api/doctors", Some("stale"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get("Cache-Control").is_none());
        assert_eq!(body_json(response).await["message"], "Invalid token");
    }

    #[tokio::test]
    async fn cases_aggregate_normalize_and_skip_failures() {
        let app = relay().await;
        let response = app
            .oneshot(make_request(
                "POST",
                "/api/cases",
                Some("upstream-jwt"),
                Some(json!({"doctorAccNos": ["A1", "A2"]})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let cases = json.as_array().unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0]["status"], "PROCESSED");
        assert_eq!(cases[0]["submittedDateTime"], "2024-05-01T10:00:00.000Z");
        assert_eq!(cases[1]["status"], "NEW");
        assert_eq!(cases[1]["original_case_status"], "");
        assert_eq!(cases[1]["submittedDateTime"], "2024-05-02T00:00:00.000Z");
    }

    #[tokio::test]
    async fn blank_doctor_ids_return_no_cases() {
        let app = relay().await;
        let response = app
            .oneshot(make_request(
                "POST",
                "/api/cases",
                Some("upstream-jwt"),
                Some(json!({"doctorAccNos": ["", null]})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn missing_doctor_ids_return_every_case() {
        let app = relay().await;
        let response = app
            .oneshot(make_request("POST", "/api/cases", Some("upstream-jwt"), Some(json!({}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cases_apply_query_filter() {
        let app = relay().await;
        let response = app
            .oneshot(make_request(
                "POST",
                "/api/cases?sort=patient_name&order=asc&search=O",
                Some("upstream-jwt"),
                Some(json!({"doctorAccNos": ["A1"]})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let names: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["patient_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Bob Brown", "zoe Adams"]);
    }

    #[tokio::test]
    async fn cases_reject_bad_query() {
        let app = relay().await;
        let response = app
            .oneshot(make_request("POST", "/api/cases?status=DONE", Some("upstream-jwt"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_update_round_trip() {
        let app = relay().await;
        let response = app
            .oneshot(make_request(
                "PUT",
                "/api/cases/7/status",
                Some("upstream-jwt"),
                Some(json!({"case_status": "PROCESSED"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["updatedCase"]["id"], 7);
        assert_eq!(json["updatedCase"]["status"], "PROCESSED");
    }

    #[tokio::test]
    async fn status_update_rejects_unknown_status() {
        let app = relay().await;
        let response = app
            .oneshot(make_request(
                "PUT",
                "/api/cases/7/status",
                Some("upstream-jwt"),
                Some(json!({"case_status": "processed"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(
            json["message"],
            "Invalid case_status provided in request body. Must be NEW or PROCESSED."
        );
    }

    #[tokio::test]
    async fn case_update_recomputes_status_from_echo() {
        let app = relay().await;
        let response = app
            .oneshot(make_request(
                "PUT",
                "/api/cases/c-9/update",
                Some("upstream-jwt"),
                Some(json!({"weight": "72.5", "case_status": "PROCESSED", "status": "NEW"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["updatedCase"]["id"], "c-9");
        assert_eq!(json["updatedCase"]["weight"], 72.5);
        assert_eq!(json["updatedCase"]["status"], "PROCESSED");
    }

    #[tokio::test]
    async fn case_update_rejects_non_object_body() {
        let app = relay().await;
        let response = app
            .oneshot(make_request("PUT", "/api/cases/1/update", Some("upstream-jwt"), Some(json!([1, 2]))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Invalid request body. Expected JSON with case data.");
    }

    #[tokio::test]
    async fn case_update_relays_upstream_not_found() {
        let app = relay().await;
        let response = app
            .oneshot(make_request(
                "PUT",
                "/api/cases/404/update",
                Some("upstream-jwt"),
                Some(json!({"weight": 70})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Case not found");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = relay().await;
        let response = app
            .oneshot(make_request("GET", "/api/nonexistent", Some("upstream-jwt"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
