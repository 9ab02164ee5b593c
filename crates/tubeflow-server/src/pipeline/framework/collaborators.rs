//! Collaborator traits
//!
//! The stages reach every external system through these traits. Default
//! implementations live in `crate::integrations`; tests plug in fakes.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::types::{
    AnalysisSummary, ChannelCounts, ChannelProfile, CompetitorChannel, FormattedScript,
    Recommendation, RenderTarget, VideoRecord, VideoScript,
};
use crate::pipeline::error::StageError;

/// Source of channel metadata and upload statistics
#[async_trait]
pub trait ChannelSource: Send + Sync {
    /// Name, logo and description of a channel
    async fn channel_profile(&self, channel_id: &str) -> Result<ChannelProfile, StageError>;

    /// Subscriber, video and view counters
    async fn channel_counts(&self, channel_id: &str) -> Result<ChannelCounts, StageError>;

    /// Up to `max_results` most recent uploads with their statistics
    async fn recent_videos(
        &self,
        channel_id: &str,
        max_results: usize,
    ) -> Result<Vec<VideoRecord>, StageError>;

    /// Channels matching a keyword search, best match first
    async fn search_channels(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<CompetitorChannel>, StageError>;
}

/// Produces recommendations and scripts (usually a language model)
#[async_trait]
pub trait ContentStrategist: Send + Sync {
    async fn recommend(&self, summary: &AnalysisSummary)
        -> Result<Vec<Recommendation>, StageError>;

    async fn write_script(&self, recommendation: &Recommendation)
        -> Result<VideoScript, StageError>;
}

/// Turns a formatted script into a video file
#[async_trait]
pub trait VideoRenderer: Send + Sync {
    /// Render into `target` and return the path of the written file
    async fn render(
        &self,
        script: &FormattedScript,
        target: &RenderTarget,
    ) -> Result<PathBuf, StageError>;
}

/// The set of collaborators a pipeline runs against
#[derive(Clone)]
pub struct Collaborators {
    pub channels: Arc<dyn ChannelSource>,
    pub strategist: Arc<dyn ContentStrategist>,
    pub renderer: Arc<dyn VideoRenderer>,
}

impl Collaborators {
    pub fn new(
        channels: Arc<dyn ChannelSource>,
        strategist: Arc<dyn ContentStrategist>,
        renderer: Arc<dyn VideoRenderer>,
    ) -> Self {
        Self {
            channels,
            strategist,
            renderer,
        }
    }
}
