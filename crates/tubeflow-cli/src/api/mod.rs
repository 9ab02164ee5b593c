//! API client module
//!
//! HTTP client for the Tubeflow server's pipeline routes.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::ApiClient;
pub use types::*;
