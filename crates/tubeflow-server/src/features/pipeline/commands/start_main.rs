//! Start main run command

use serde::{Deserialize, Serialize};
use tubeflow_common::types::{MessageResponse, StartRequest};

use crate::pipeline::{AdmissionError, JobSupervisor};

/// Command to start the six-stage main run
///
/// A missing channel falls back to the configured default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartMainCommand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

impl From<StartRequest> for StartMainCommand {
    fn from(request: StartRequest) -> Self {
        Self {
            channel_id: request.channel_id,
        }
    }
}

pub fn handle(
    supervisor: &JobSupervisor,
    command: StartMainCommand,
) -> Result<MessageResponse, AdmissionError> {
    let accepted = supervisor.start_main(command.channel_id.as_deref())?;
    Ok(MessageResponse::new(accepted.message))
}
