//! Server startup and graceful shutdown

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use pixelmill_core::Config;

/// Bind the configured port and serve until a shutdown signal arrives.
///
/// In-flight image jobs are allowed to finish before the process exits.
pub async fn start_server(config: &Config, app: Router) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port()));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        addr = %addr,
        environment = config.environment(),
        max_image_mb = config.max_file_size_bytes() / 1024 / 1024,
        rate_limit = config.rate_limit_max_requests(),
        rate_limit_window_secs = config.rate_limit_window_secs(),
        processing_timeout_secs = config.processing_timeout_secs(),
        "Image processing API listening"
    );

    // Peer addresses feed the per-IP rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server terminated with an error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
///
/// # Panics
/// If a signal handler cannot be installed.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    };

    tracing::info!(signal = signal, "Draining in-flight requests before shutdown");
}
