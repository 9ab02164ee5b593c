//! Feature modules implementing the Tubeflow API
//!
//! Each feature is a vertical slice with its own commands, queries and
//! routes.
//!
//! # Features
//!
//! - **pipeline**: job start requests and the polled status snapshot
//!
//! # Architecture
//!
//! Each feature module follows the structure:
//! - `commands/` - Operations that change state (start a job)
//! - `queries/` - Read operations
//! - `routes.rs` - HTTP route definitions

pub mod pipeline;

use axum::Router;

use crate::pipeline::JobSupervisor;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Admission point for jobs; also owns the progress store
    pub supervisor: JobSupervisor,
}

/// Creates the router with all feature routes mounted
///
/// Routes are relative; the caller decides where to mount them.
pub fn router(state: FeatureState) -> Router<()> {
    Router::new().merge(pipeline::pipeline_routes().with_state(state.supervisor))
}
