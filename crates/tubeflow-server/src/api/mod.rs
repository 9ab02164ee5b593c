//! HTTP surface
//!
//! Feature routes are mounted twice, at the root and under `/api`, so both
//! the dashboard's `/api/...` calls and bare `curl` paths work. Rendered
//! artifacts are served from the output directory.

pub mod response;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use tower_http::{compression::CompressionLayer, services::ServeDir};

use crate::config::Config;
use crate::features;
use crate::middleware;
use crate::pipeline::JobSupervisor;

/// Build the application router with all routes and middleware
pub fn create_router(supervisor: JobSupervisor, config: &Config) -> Router {
    let feature_state = features::FeatureState { supervisor };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(features::router(feature_state.clone()))
        .nest("/api", features::router(feature_state))
        .nest_service(
            &config.pipeline.outputs_url_prefix,
            ServeDir::new(&config.pipeline.output_dir),
        )
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Bind and serve until `shutdown` resolves
pub async fn serve<F>(config: &Config, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = config.bind_address().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Tubeflow Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
