use std::collections::HashSet;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::{Map, Value};

use super::envelope;
use super::UpstreamError;
use crate::config::{
    CaseFetchStrategy, ConfigError, RelayConfig, ACC_NO_PLACEHOLDER, CASE_ID_PLACEHOLDER,
};
use crate::models::{token_preview, AuthToken, Case, CaseStatus, Doctor};
use crate::normalize::{filter_test_practices, normalize_case};

/// Async HTTP client for the upstream MediBill API.
///
/// Holds the relay configuration and one pooled `reqwest::Client`; cloning
/// is cheap and shares both.
#[derive(Clone)]
pub struct UpstreamClient {
    config: Arc<RelayConfig>,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct StatusUpdateRequest {
    case_status: CaseStatus,
}

impl UpstreamClient {
    pub fn new(config: RelayConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("medibill-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    // ─── Login ───────────────────────────────────────────────

    /// Log in upstream with the configured application credentials.
    ///
    /// The dashboard's password is ignored unless
    /// `forward_client_password` is enabled.
    pub async fn login(&self, client_password: Option<&str>) -> Result<AuthToken, UpstreamError> {
        let url = self.endpoint(&self.config.paths.login)?;
        let credentials = &self.config.credentials;
        let password = match client_password.filter(|p| !p.is_empty()) {
            Some(p) if self.config.forward_client_password => p,
            _ => credentials.password.as_str(),
        };

        tracing::info!(%url, email = %credentials.email, "Attempting upstream login");

        let body = LoginRequest {
            email: &credentials.email,
            password,
        };
        let request = self.http.post(url.clone()).json(&body);
        let json = self.send(request, "login", &url).await?;
        let grant = envelope::parse_login(&json).inspect_err(|_| {
            tracing::error!("Upstream login response has no token");
        })?;

        tracing::info!("Upstream login successful");
        Ok(AuthToken::issued_at(
            grant.token,
            chrono::Utc::now().timestamp_millis(),
            grant.expires_in,
        ))
    }

    // ─── Doctors ─────────────────────────────────────────────

    /// Fetch doctors, minus test practices.
    pub async fn fetch_doctors(&self, token: &str) -> Result<Vec<Doctor>, UpstreamError> {
        let url = self.endpoint(&self.config.paths.doctors)?;
        let json = self.get_json(token, "doctors", &url).await?;
        let doctors = envelope::parse_doctors(json)?;
        let total = doctors.len();
        let kept = filter_test_practices(doctors);
        tracing::info!(total, kept = kept.len(), "Fetched doctors");
        Ok(kept)
    }

    // ─── Cases ───────────────────────────────────────────────

    /// Fetch and normalize the cases of one doctor.
    pub async fn fetch_doctor_cases(
        &self,
        token: &str,
        doctor_acc_no: &str,
    ) -> Result<Vec<Case>, UpstreamError> {
        let path = fill(&self.config.paths.doctor_cases, ACC_NO_PLACEHOLDER, doctor_acc_no);
        let url = self.endpoint(&path)?;
        let json = self.get_json(token, "cases", &url).await?;
        let cases: Vec<Case> = envelope::parse_cases(json)?
            .into_iter()
            .map(normalize_case)
            .collect();
        tracing::debug!(doctor_acc_no, count = cases.len(), "Fetched doctor cases");
        Ok(cases)
    }

    /// Fetch and normalize every case visible to the token.
    pub async fn fetch_all_cases(&self, token: &str) -> Result<Vec<Case>, UpstreamError> {
        let url = self.endpoint(&self.config.paths.cases)?;
        let json = self.get_json(token, "cases", &url).await?;
        Ok(envelope::parse_cases(json)?
            .into_iter()
            .map(normalize_case)
            .collect())
    }

    /// Collect the cases of several doctors.
    ///
    /// Never fails as a batch: a doctor whose fetch fails is logged and
    /// skipped. Results keep the order of `doctor_acc_nos`. No deduplication.
    /// An empty list returns every case visible to the token.
    pub async fn aggregate_cases(&self, token: &str, doctor_acc_nos: &[String]) -> Vec<Case> {
        if doctor_acc_nos.is_empty() {
            tracing::info!("No doctor account numbers given, fetching all cases");
            return self.fetch_all_cases(token).await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Fetching all cases failed");
                Vec::new()
            });
        }

        match self.config.case_fetch {
            CaseFetchStrategy::PerDoctor => self.aggregate_per_doctor(token, doctor_acc_nos).await,
            CaseFetchStrategy::BulkFilter => self.aggregate_bulk(token, doctor_acc_nos).await,
        }
    }

    async fn aggregate_per_doctor(&self, token: &str, doctor_acc_nos: &[String]) -> Vec<Case> {
        let concurrency = self.config.case_fetch_concurrency.max(1);

        // `buffered` yields in input order regardless of completion order.
        let results: Vec<(String, Result<Vec<Case>, UpstreamError>)> =
            stream::iter(doctor_acc_nos.iter().cloned())
                .map(|acc_no| async move {
                    let result = self.fetch_doctor_cases(token, &acc_no).await;
                    (acc_no, result)
                })
                .buffered(concurrency)
                .collect()
                .await;

        let mut all = Vec::new();
        let mut failed = 0usize;
        for (acc_no, result) in results {
            match result {
                Ok(cases) => all.extend(cases),
                Err(e) => {
                    failed += 1;
                    tracing::warn!(doctor_acc_no = %acc_no, error = %e, "Skipping doctor after failed case fetch");
                }
            }
        }

        tracing::info!(
            doctors = doctor_acc_nos.len(),
            failed,
            cases = all.len(),
            "Aggregated cases"
        );
        all
    }

    async fn aggregate_bulk(&self, token: &str, doctor_acc_nos: &[String]) -> Vec<Case> {
        let wanted: HashSet<&str> = doctor_acc_nos.iter().map(String::as_str).collect();
        match self.fetch_all_cases(token).await {
            Ok(cases) => {
                let total = cases.len();
                let kept: Vec<Case> = cases
                    .into_iter()
                    .filter(|case| {
                        case.record
                            .doctor_acc_no
                            .as_deref()
                            .is_some_and(|acc| wanted.contains(acc))
                    })
                    .collect();
                tracing::info!(total, kept = kept.len(), "Filtered cases by doctor");
                kept
            }
            Err(e) => {
                tracing::warn!(error = %e, "Bulk case fetch failed");
                Vec::new()
            }
        }
    }

    // ─── Updates ─────────────────────────────────────────────

    /// Set a case's status upstream and return the normalized echo.
    pub async fn update_case_status(
        &self,
        token: &str,
        case_id: &str,
        status: CaseStatus,
    ) -> Result<Case, UpstreamError> {
        let path = fill(&self.config.paths.case_status, CASE_ID_PLACEHOLDER, case_id);
        let url = self.endpoint(&path)?;
        tracing::info!(%url, case_id, %status, "Forwarding case status update");

        let request = self
            .authorized(Method::PUT, &url, token)
            .json(&StatusUpdateRequest { case_status: status });
        let json = self.send(request, "case status update", &url).await?;
        Ok(normalize_case(envelope::parse_updated_case(json)?))
    }

    /// Send a partial case object upstream and return the normalized echo.
    ///
    /// The returned status comes from the echoed `case_status`, never from
    /// the request payload.
    pub async fn update_case(
        &self,
        token: &str,
        case_id: &str,
        changes: Map<String, Value>,
    ) -> Result<Case, UpstreamError> {
        let path = fill(&self.config.paths.case_update, CASE_ID_PLACEHOLDER, case_id);
        let url = self.endpoint(&path)?;
        tracing::info!(%url, case_id, fields = changes.len(), "Forwarding case update");

        let request = self
            .authorized(Method::PUT, &url, token)
            .json(&Value::Object(changes));
        let json = self.send(request, "case update", &url).await?;
        Ok(normalize_case(envelope::parse_updated_case(json)?))
    }

    // ─── Plumbing ────────────────────────────────────────────

    fn endpoint(&self, path: &str) -> Result<Url, UpstreamError> {
        let full = if path.starts_with('/') {
            format!("{}{}", self.config.base_url, path)
        } else {
            format!("{}/{}", self.config.base_url, path)
        };
        Url::parse(&full).map_err(|e| UpstreamError::Config(format!("invalid endpoint URL {full}: {e}")))
    }

    fn authorized(&self, method: Method, url: &Url, token: &str) -> reqwest::RequestBuilder {
        self.http.request(method, url.clone()).bearer_auth(token)
    }

    async fn get_json(&self, token: &str, resource: &str, url: &Url) -> Result<Value, UpstreamError> {
        tracing::debug!(%url, token = %token_preview(token), "Proxying GET");
        let request = self.authorized(Method::GET, url, token);
        self.send(request, resource, url).await
    }

    /// Send a request and read a JSON body, mapping every failure mode onto
    /// `UpstreamError`.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        resource: &str,
        url: &Url,
    ) -> Result<Value, UpstreamError> {
        let unreachable = |e: reqwest::Error| {
            tracing::error!(%url, error = %e, "Upstream request failed");
            UpstreamError::Unreachable(format!(
                "Network error or external API unreachable for {resource} at {url}."
            ))
        };

        let response = request.send().await.map_err(unreachable)?;
        let status = response.status();
        let text = response.text().await.map_err(unreachable)?;

        if !status.is_success() {
            let preview: String = text.chars().take(200).collect();
            tracing::error!(%url, status = status.as_u16(), body = %preview, "Upstream returned error status");
            let message = envelope::error_message(
                &text,
                format!("External API error for {resource}: {}", status.as_u16()),
            );
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            let preview: String = text.chars().take(200).collect();
            tracing::error!(%url, error = %e, body = %preview, "Upstream returned non-JSON body");
            UpstreamError::Malformed(format!("Malformed JSON response from external {resource} API."))
        })
    }
}

/// Substitute a percent-encoded value for `placeholder` in a path template.
fn fill(template: &str, placeholder: &str, value: &str) -> String {
    template.replace(placeholder, &urlencoding::encode(value))
}
