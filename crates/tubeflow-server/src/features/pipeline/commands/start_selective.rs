//! Start selective job command

use serde::{Deserialize, Serialize};
use tubeflow_common::types::{GenerateRequest, MessageResponse};

use crate::pipeline::{AdmissionError, JobSupervisor};

/// Command to render the video for one recommendation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StartSelectiveCommand {
    /// Zero-based index into the current recommendations, as the client sent it
    pub index: i64,
}

impl From<GenerateRequest> for StartSelectiveCommand {
    fn from(request: GenerateRequest) -> Self {
        Self {
            index: request.index,
        }
    }
}

pub fn handle(
    supervisor: &JobSupervisor,
    command: StartSelectiveCommand,
) -> Result<MessageResponse, AdmissionError> {
    let accepted = supervisor.start_selective(command.index)?;
    Ok(MessageResponse::new(accepted.message))
}
