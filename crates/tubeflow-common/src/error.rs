//! Error types for Tubeflow

use thiserror::Error;

/// Result type alias for Tubeflow operations
pub type Result<T> = std::result::Result<T, TubeflowError>;

/// Main error type shared across Tubeflow crates
#[derive(Error, Debug)]
pub enum TubeflowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid status payload: {0}")]
    InvalidStatus(String),
}

impl TubeflowError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }
}
