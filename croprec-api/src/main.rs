//! croprec-api - crop recommendation prediction service
//!
//! Loads the model artifact written by croprec-train once at startup and
//! serves `POST /predict`. A missing or incompatible artifact stops startup.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use croprec_api::config::{Args, ServiceConfig};
use croprec_api::{build_router, load_state, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let log_handle = logging::init();

    let args = Args::parse();
    let config = ServiceConfig::load(&args)?;
    if !logging::env_filter_overridden() {
        logging::apply_level(&log_handle, &config.log_level)?;
    }

    info!(
        "Starting croprec-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!(
        "Model path: {} (strict encoding: {})",
        config.model_path.display(),
        config.strict_encoding
    );

    let state = match load_state(&config) {
        Ok(state) => state,
        Err(e) => {
            error!("{:#}", e);
            return Err(e);
        }
    };
    let app = build_router(state);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("croprec-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
