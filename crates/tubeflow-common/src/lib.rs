//! Tubeflow Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the Tubeflow workspace.
//!
//! # Overview
//!
//! This crate provides functionality used by both the server and the CLI:
//!
//! - **Error Handling**: Shared error type and result alias
//! - **Logging**: Centralized `tracing` subscriber setup
//! - **Types**: The status wire format and the polling termination rule
//!
//! # Example
//!
//! ```no_run
//! use tubeflow_common::types::{PollTarget, StatusResponse};
//!
//! fn should_stop(snapshot: &StatusResponse) -> bool {
//!     PollTarget::MainRun.is_finished(snapshot)
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, TubeflowError};
