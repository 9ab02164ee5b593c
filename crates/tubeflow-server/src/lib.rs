//! Tubeflow Server Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! HTTP server that runs the channel analysis pipeline and reports its
//! progress to polling clients.
//!
//! # Overview
//!
//! - **Pipeline**: six-stage main run, four-stage selective video job,
//!   single-slot job supervisor and the shared progress store
//! - **Integrations**: YouTube Data API, Ollama and render worker clients
//! - **API Endpoints**: `/start`, `/generate_selected`, `/status`, also under `/api`
//! - **Configuration**: environment-based, with `.env` support
//! - **Middleware**: CORS and request logging
//!
//! # Architecture
//!
//! Requests never run pipeline work themselves. A start request goes to the
//! [`pipeline::JobSupervisor`], which either refuses it or writes the job's
//! first snapshot and hands it to the worker task. Handlers answer right
//! away; clients poll `/status` until their job reaches a terminal state.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tubeflow_server::{api, config::Config, integrations, pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let collaborators = integrations::default_collaborators(&config.pipeline)?;
//!     let (supervisor, _worker) = pipeline::JobSupervisor::start(
//!         pipeline::ProgressStore::new(),
//!         collaborators,
//!         Arc::new(config.pipeline.clone()),
//!     );
//!     let app = api::create_router(supervisor, &config);
//!     api::serve(&config, app, std::future::pending()).await
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod integrations;
pub mod middleware;
pub mod pipeline;

// Re-export commonly used types
pub use error::{ApiResult, AppError};
