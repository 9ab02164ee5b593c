//! HTTP API client for the Tubeflow server

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::api::{endpoints, types::*};
use crate::error::{CliError, Result};

// ============================================================================
// API Client Constants
// ============================================================================

/// Default timeout for API requests in seconds.
/// Can be overridden via TUBEFLOW_API_TIMEOUT_SECS environment variable.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Default Tubeflow server URL when not specified via environment variable.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// API client for the Tubeflow server
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let timeout_secs = std::env::var("TUBEFLOW_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_API_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("TUBEFLOW_SERVER_URL")
            .unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());

        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check server health
    pub async fn health_check(&self) -> Result<bool> {
        let url = endpoints::health_url(&self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Start the main run on `channel_id`, or the server's default channel
    pub async fn start(&self, channel_id: Option<&str>) -> Result<MessageResponse> {
        let url = endpoints::start_url(&self.base_url);
        let request = StartRequest {
            channel_id: channel_id.map(str::to_string),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        Self::parse(response).await
    }

    /// Start the selective job for the 0-based recommendation `index`
    pub async fn generate_selected(&self, index: usize) -> Result<MessageResponse> {
        let url = endpoints::generate_selected_url(&self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                index: i64::try_from(index).unwrap_or(i64::MAX),
            })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        Self::parse(response).await
    }

    /// Fetch the current snapshot
    pub async fn status(&self) -> Result<StatusResponse> {
        let url = endpoints::status_url(&self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        Self::parse(response).await
    }

    /// Absolute URL for an artifact path from the snapshot
    pub fn artifact_url(&self, path: &str) -> String {
        endpoints::artifact_url(&self.base_url, path)
    }

    fn transport_error(&self, err: reqwest::Error) -> CliError {
        if err.is_connect() {
            CliError::Unreachable(self.base_url.clone())
        } else {
            CliError::Http(err)
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            return Ok(serde_json::from_slice(&body)?);
        }

        match serde_json::from_slice::<ErrorEnvelope>(&body) {
            Ok(envelope) => Err(CliError::Rejected {
                status: status.as_u16(),
                code: envelope.error.code,
                message: envelope.error.message,
            }),
            Err(_) => Err(CliError::api(format!("unexpected response {status}"))),
        }
    }
}
