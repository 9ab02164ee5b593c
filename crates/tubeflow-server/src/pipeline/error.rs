//! Pipeline error types
//!
//! Two families: admission errors are returned synchronously to the caller
//! of the supervisor and never touch the progress store; stage errors are
//! caught at the runner boundary and turned into an `Error` snapshot.

use thiserror::Error;

/// Why a start request was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("A pipeline job is already active")]
    Busy,

    #[error("Recommendation index {index} is out of range ({len} available)")]
    InvalidIndex { index: i64, len: usize },

    #[error("No recommendations yet; run the main pipeline first")]
    NotReady,

    #[error("No channel id given and no default CHANNEL_ID configured")]
    InvalidChannel,

    #[error("The job worker is not running")]
    WorkerUnavailable,
}

/// Failure of a single pipeline stage
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Failed to fetch channel data: {0}")]
    Fetch(String),

    #[error("Language model request failed: {0}")]
    Inference(String),

    #[error("Video rendering failed: {0}")]
    Render(String),

    #[error("No videos found for this channel")]
    NoVideos,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid index")]
    InvalidIndex,

    #[error("Stage panicked: {0}")]
    Panicked(String),
}

impl StageError {
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

impl From<serde_json::Error> for StageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }
}
