//! Pipeline framework
//!
//! The pieces every runner is built from: the progress store, the stage
//! contract with its sequential driver, the collaborator traits and the
//! shared data types.

pub mod collaborators;
pub mod stage;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use collaborators::{ChannelSource, Collaborators, ContentStrategist, VideoRenderer};
pub use stage::{Stage, StageSequence, StageState, StepFailure};
pub use store::ProgressStore;
pub use types::{
    step_detail, AnalysisSummary, ChannelCounts, ChannelProfile, ChannelStats, Competitor,
    CompetitorChannel, CompetitorSummary, EstimatedEngagement, FormattedScript, FormattedSection, PipelineState, ProgressSnapshot,
    Recommendation, RenderTarget, ScriptMetadata, ScriptSection, StepProgress, VideoEngagement,
    VideoRecord, VideoScript,
};
