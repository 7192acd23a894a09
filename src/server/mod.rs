//! Block Profit Server Module
//!
//! Web UI and JSON API around a trained pipeline artifact.

mod api;
mod error;
mod handlers;
mod state;
mod ui;

pub use api::create_router;
pub use error::ServerError;
pub use handlers::PredictionResponse;
pub use state::{AppState, ModelState};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::artifact::DEFAULT_ARTIFACT_PATH;

/// Default listening port
pub const DEFAULT_PORT: u16 = 8501;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
}

/// Default listening host
pub const DEFAULT_HOST: &str = "0.0.0.0";

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_path: PathBuf::from(DEFAULT_ARTIFACT_PATH),
        }
    }
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();

    let state = Arc::new(AppState::new(config.clone()));
    // Load eagerly so a missing artifact is reported at startup
    if !state.model().is_loaded() {
        warn!(
            model_path = %config.model_path.display(),
            "Serving without a model; run `block-profit train` and restart"
        );
    }

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        host = %config.host,
        port = config.port,
        address = %addr,
        model_path = %config.model_path.display(),
        started_at = %start_time.to_rfc3339(),
        "Block profit server starting"
    );
    info!(url = %format!("http://{}", addr), "Web UI available");
    info!(url = %format!("http://{}/api/health", addr), "Health endpoint available");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");

    // Graceful shutdown on ctrl+c
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
        let stop_time = chrono::Utc::now();
        let uptime = stop_time.signed_duration_since(start_time);
        info!(
            stopped_at = %stop_time.to_rfc3339(),
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_ignores_environment() {
        std::env::set_var("API_PORT", "9999");
        std::env::set_var("MODEL_PATH", "elsewhere.json");
        let config = ServerConfig::default();
        std::env::remove_var("API_PORT");
        std::env::remove_var("MODEL_PATH");

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.model_path, PathBuf::from("xgboost_pipeline.json"));
    }
}
