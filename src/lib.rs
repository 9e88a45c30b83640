pub mod api;
pub mod config;
pub mod models;
pub mod normalize;
pub mod upstream;

#[cfg(test)]
mod test_support;

use tracing_subscriber::EnvFilter;

use crate::api::{start_relay_server, ServerError};
use crate::config::{ConfigError, RelayConfig};
use crate::upstream::UpstreamClient;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(std::io::Error),
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// built-in filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Load configuration from the environment, serve until Ctrl-C, then drain.
pub async fn run() -> Result<(), RunError> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = RelayConfig::from_env()?;
    let bind_addr = config.bind_addr;
    let upstream = UpstreamClient::new(config)?;

    let mut server = start_relay_server(upstream, bind_addr).await?;
    tracing::info!(
        addr = %server.session.server_addr,
        session = %server.session.session_id,
        "Relay listening"
    );

    let signal = tokio::signal::ctrl_c().await.map_err(RunError::Signal);
    server.shutdown();
    server.wait().await;
    signal
}
