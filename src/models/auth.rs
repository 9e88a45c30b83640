use serde::{Deserialize, Serialize};

/// Upstream bearer token handed to the dashboard after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub token: String,

    /// Expiry in milliseconds since the Unix epoch.
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

/// Default token lifetime when upstream omits `expires_in`.
pub const DEFAULT_TOKEN_TTL_MS: i64 = 3_600_000;

impl AuthToken {
    /// Build a token expiring `expires_in_secs` after `now_ms`, or one hour
    /// after when upstream did not say.
    pub fn issued_at(token: String, now_ms: i64, expires_in_secs: Option<i64>) -> Self {
        let ttl_ms = expires_in_secs
            .filter(|secs| *secs > 0)
            .map(|secs| secs.saturating_mul(1000))
            .unwrap_or(DEFAULT_TOKEN_TTL_MS);
        Self {
            token,
            expires_at: now_ms.saturating_add(ttl_ms),
        }
    }
}

/// First characters of a token, safe for logs.
pub fn token_preview(token: &str) -> String {
    let prefix: String = token.chars().take(10).collect();
    format!("{prefix}...")
}
