//! Shared helpers for tests that need a stand-in upstream API.

use axum::Router;

use crate::config::RelayConfig;

/// Serve `app` on an ephemeral localhost port and return its base URL.
pub async fn spawn_upstream(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock upstream");
    let addr = listener.local_addr().expect("mock upstream address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

/// Relay config pointing at `base_url` with fixed test credentials.
pub fn test_config(base_url: &str) -> RelayConfig {
    RelayConfig::new(base_url, "relay@example.com", "configured-password")
        .expect("valid test config")
}
