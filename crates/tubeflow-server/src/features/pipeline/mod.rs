//! Pipeline feature module
//!
//! Starts jobs and serves the status snapshot polled by the dashboard and
//! the CLI.

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::pipeline_routes;
