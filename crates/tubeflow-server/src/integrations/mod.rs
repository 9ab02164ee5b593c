//! Default collaborators
//!
//! - **youtube**: channel metadata and upload statistics
//! - **ollama**: recommendations and scripts from a local language model
//! - **render_worker**: video rendering on a remote worker

pub mod ollama;
pub mod render_worker;
pub mod youtube;

use std::sync::Arc;

use crate::pipeline::config::PipelineConfig;
use crate::pipeline::error::StageError;
use crate::pipeline::framework::Collaborators;

pub use ollama::OllamaStrategist;
pub use render_worker::RenderWorkerClient;
pub use youtube::YouTubeClient;

/// Collaborators talking to the services named in `config`
pub fn default_collaborators(config: &PipelineConfig) -> Result<Collaborators, StageError> {
    Ok(Collaborators::new(
        Arc::new(YouTubeClient::from_config(config)?),
        Arc::new(OllamaStrategist::from_config(config)?),
        Arc::new(RenderWorkerClient::from_config(config)?),
    ))
}
