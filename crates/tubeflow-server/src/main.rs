//! Tubeflow Server - Main entry point

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tubeflow_common::logging::{init_logging, LogConfig};

use tubeflow_server::{
    api,
    config::Config,
    integrations,
    pipeline::{JobSupervisor, ProgressStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up LOG_* from .env before logging starts
    dotenvy::dotenv().ok();

    let log_config = LogConfig::builder()
        .log_file_prefix("tubeflow-server".to_string())
        .filter_directives("tubeflow_server=debug,tower_http=debug,reqwest=info".to_string())
        .build();

    // Environment variables take precedence
    let log_config = log_config.merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting Tubeflow Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    tokio::fs::create_dir_all(&config.pipeline.output_dir).await?;

    let collaborators = integrations::default_collaborators(&config.pipeline)?;
    let (supervisor, worker) = JobSupervisor::start(
        ProgressStore::new(),
        collaborators,
        Arc::new(config.pipeline.clone()),
    );
    info!("Job worker ready");

    let app = api::create_router(supervisor, &config);

    api::serve(&config, app, shutdown_signal(config.server.shutdown_timeout_secs)).await?;

    // Dropping the router released the last job sender; an active job is abandoned.
    worker.abort();
    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
