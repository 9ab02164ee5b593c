//! Error types for the Tubeflow CLI
//!
//! Messages are shown to users as-is, so each one says what to check next.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// The server refused the request with an error envelope
    #[error("{message} ({code})")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    /// The server answered with something other than the expected payload
    #[error("Server error: {0}. Ensure the Tubeflow server is running and the URL is correct.")]
    Api(String),

    /// The server could not be reached
    #[error("Cannot reach the Tubeflow server at {0}. Start it with 'tubeflow-server' or pass --server-url.")]
    Unreachable(String),

    /// The watched job ended in `Error`
    #[error("{0}")]
    JobFailed(String),

    /// HTTP request failed
    #[error("Network request failed: {0}. Check your connection and server URL.")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables.")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create an API error
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Machine-readable code of a refused request
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }
}
