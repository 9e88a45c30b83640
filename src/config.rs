//! Relay configuration.
//!
//! Everything the relay needs to reach the upstream billing API lives in
//! `RelayConfig`, built once at startup and handed to the client and router.
//! Endpoint paths are configuration because the upstream contract has moved
//! between revisions.

use std::net::SocketAddr;

/// Application-level constants
pub const APP_NAME: &str = "MediBill Relay";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BASE_URL: &str = "https://api.medibill.co.za/api/v1";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Placeholder substituted with a doctor account number.
pub const ACC_NO_PLACEHOLDER: &str = "{accNo}";
/// Placeholder substituted with a case identifier.
pub const CASE_ID_PLACEHOLDER: &str = "{id}";

pub const DEFAULT_LOG_FILTER: &str = "medibill_relay=info,tower_http=warn";

/// Tracing filter used when `RUST_LOG` is not set: `MEDIBILL_LOG`, else
/// `DEFAULT_LOG_FILTER`.
pub fn default_log_filter() -> String {
    log_filter_from_lookup(|key| std::env::var(key).ok())
}

pub fn log_filter_from_lookup<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("MEDIBILL_LOG")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),
    #[error("API base URL is not a valid absolute URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("HTTP client could not be built: {0}")]
    HttpClient(String),
    #[error("Endpoint template {key} must contain {placeholder}")]
    MissingPlaceholder {
        key: &'static str,
        placeholder: &'static str,
    },
}

/// How the aggregator collects cases for a set of doctors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseFetchStrategy {
    /// One upstream request per doctor account number.
    PerDoctor,
    /// A single request for all cases, filtered by `doctor_acc_no`.
    BulkFilter,
}

impl std::str::FromStr for CaseFetchStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-doctor" | "per_doctor" => Ok(Self::PerDoctor),
            "bulk-filter" | "bulk_filter" => Ok(Self::BulkFilter),
            _ => Err(()),
        }
    }
}

/// Upstream endpoint paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPaths {
    pub login: String,
    pub doctors: String,
    pub cases: String,
    /// Must contain `{accNo}`.
    pub doctor_cases: String,
    /// Must contain `{id}`.
    pub case_status: String,
    /// Must contain `{id}`.
    pub case_update: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            login: "/auth/login".into(),
            doctors: "/doctors".into(),
            cases: "/cases".into(),
            doctor_cases: "/cases/submissions/doctors/{accNo}".into(),
            case_status: "/cases/{id}/status".into(),
            case_update: "/cases/submissions/update/{id}".into(),
        }
    }
}

/// Application credentials used for the upstream login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

// Keep the password out of logs and panics.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub base_url: String,
    pub credentials: Credentials,
    /// Forward the password submitted by the dashboard instead of the
    /// configured one when the client sends one.
    pub forward_client_password: bool,
    pub bind_addr: SocketAddr,
    pub paths: EndpointPaths,
    pub case_fetch: CaseFetchStrategy,
    /// Maximum per-doctor fetches in flight. 1 means strictly sequential.
    pub case_fetch_concurrency: usize,
}

impl RelayConfig {
    /// Config with default paths and the given upstream + credentials.
    pub fn new(base_url: &str, email: &str, password: &str) -> Result<Self, ConfigError> {
        let config = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: Credentials {
                email: email.to_string(),
                password: password.to_string(),
            },
            forward_client_password: false,
            bind_addr: default_bind_addr(),
            paths: EndpointPaths::default(),
            case_fetch: CaseFetchStrategy::PerDoctor,
            case_fetch_concurrency: 1,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let base_url = get("MEDIBILL_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let email = get("MEDIBILL_APP_EMAIL").ok_or(ConfigError::Missing("MEDIBILL_APP_EMAIL"))?;
        // Passwords may legitimately have surrounding whitespace.
        let password = lookup("MEDIBILL_APP_PASSWORD")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("MEDIBILL_APP_PASSWORD"))?;

        let mut config = Self::new(&base_url, &email, &password)?;

        if let Some(raw) = get("MEDIBILL_FORWARD_CLIENT_PASSWORD") {
            config.forward_client_password = parse_bool(&raw).ok_or(ConfigError::InvalidValue {
                key: "MEDIBILL_FORWARD_CLIENT_PASSWORD",
                value: raw,
            })?;
        }

        if let Some(raw) = get("MEDIBILL_BIND_ADDR") {
            config.bind_addr = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MEDIBILL_BIND_ADDR",
                value: raw,
            })?;
        }

        let paths = &mut config.paths;
        for (key, slot) in [
            ("MEDIBILL_LOGIN_PATH", &mut paths.login),
            ("MEDIBILL_DOCTORS_PATH", &mut paths.doctors),
            ("MEDIBILL_CASES_PATH", &mut paths.cases),
            ("MEDIBILL_DOCTOR_CASES_PATH", &mut paths.doctor_cases),
            ("MEDIBILL_CASE_STATUS_PATH", &mut paths.case_status),
            ("MEDIBILL_CASE_UPDATE_PATH", &mut paths.case_update),
        ] {
            if let Some(value) = get(key) {
                *slot = value;
            }
        }

        if let Some(raw) = get("MEDIBILL_CASE_FETCH") {
            config.case_fetch = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MEDIBILL_CASE_FETCH",
                value: raw,
            })?;
        }

        if let Some(raw) = get("MEDIBILL_CASE_FETCH_CONCURRENCY") {
            config.case_fetch_concurrency = raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidValue {
                    key: "MEDIBILL_CASE_FETCH_CONCURRENCY",
                    value: raw,
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the base URL and endpoint templates.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lower = self.base_url.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://"))
            || reqwest::Url::parse(&self.base_url).is_err()
        {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }

        if self.credentials.email.trim().is_empty() {
            return Err(ConfigError::Missing("MEDIBILL_APP_EMAIL"));
        }
        if self.credentials.password.is_empty() {
            return Err(ConfigError::Missing("MEDIBILL_APP_PASSWORD"));
        }

        for (key, template, placeholder) in [
            ("MEDIBILL_DOCTOR_CASES_PATH", &self.paths.doctor_cases, ACC_NO_PLACEHOLDER),
            ("MEDIBILL_CASE_STATUS_PATH", &self.paths.case_status, CASE_ID_PLACEHOLDER),
            ("MEDIBILL_CASE_UPDATE_PATH", &self.paths.case_update, CASE_ID_PLACEHOLDER),
        ] {
            if !template.contains(placeholder) {
                return Err(ConfigError::MissingPlaceholder { key, placeholder });
            }
        }

        if self.case_fetch_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MEDIBILL_CASE_FETCH_CONCURRENCY",
                value: "0".into(),
            });
        }

        Ok(())
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
