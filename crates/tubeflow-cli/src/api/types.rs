//! API response types used only by the client
//!
//! Success payloads come from `tubeflow_common::types`.

use serde::Deserialize;

pub use tubeflow_common::types::{
    GenerateRequest, MessageResponse, PipelineStatus, PollTarget, StartRequest, StatusResponse,
};

/// Error envelope of a refused request
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}
