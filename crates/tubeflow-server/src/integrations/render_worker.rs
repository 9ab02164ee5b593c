//! Remote render worker client
//!
//! The worker does the heavy lifting (narration, visuals, encoding) on its
//! own hardware. We check its health, post the formatted script and stream
//! the finished video into the output directory.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};
use url::Url;

use crate::pipeline::config::PipelineConfig;
use crate::pipeline::error::StageError;
use crate::pipeline::framework::{FormattedScript, RenderTarget, VideoRenderer};

const HEALTH_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    script: &'a FormattedScript,
    file_stem: &'a str,
}

#[derive(Debug, Deserialize)]
struct RenderResponse {
    #[serde(default)]
    video_id: Option<String>,
    download_url: String,
}

/// Video renderer delegating to an HTTP render worker
pub struct RenderWorkerClient {
    client: Client,
    base_url: Option<Url>,
    render_timeout: Duration,
}

impl RenderWorkerClient {
    pub fn new(base_url: Option<&str>, render_timeout: Duration) -> Result<Self, StageError> {
        let base_url = base_url
            .map(|raw| {
                // Trailing slash so relative download paths join under it.
                let normalized = format!("{}/", raw.trim_end_matches('/'));
                Url::parse(&normalized)
                    .map_err(|e| StageError::render(format!("invalid render worker URL: {e}")))
            })
            .transpose()?;

        let client = Client::builder()
            .build()
            .map_err(|e| StageError::render(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            render_timeout,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, StageError> {
        Self::new(config.render_worker_url.as_deref(), config.render_timeout())
    }

    fn base(&self) -> Result<&Url, StageError> {
        self.base_url
            .as_ref()
            .ok_or_else(|| StageError::render("RENDER_WORKER_URL is not configured"))
    }

    fn endpoint(&self, path: &str) -> Result<Url, StageError> {
        self.base()?
            .join(path)
            .map_err(|e| StageError::render(format!("invalid worker path '{path}': {e}")))
    }

    /// Whether the worker answers its health check
    pub async fn health(&self) -> Result<(), StageError> {
        let url = self.endpoint("health")?;
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(HEALTH_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| StageError::render(format!("render worker unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(StageError::render(format!(
                "render worker unhealthy: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn download(&self, url: Url, path: &Path) -> Result<u64, StageError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.render_timeout)
            .send()
            .await
            .map_err(|e| StageError::render(format!("download of {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(StageError::render(format!(
                "download of {url} returned {}",
                response.status()
            )));
        }

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let mut reader = StreamReader::new(stream);
        let mut file = tokio::fs::File::create(path).await?;
        let written = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;

        Ok(written)
    }
}

#[async_trait]
impl VideoRenderer for RenderWorkerClient {
    async fn render(
        &self,
        script: &FormattedScript,
        target: &RenderTarget,
    ) -> Result<PathBuf, StageError> {
        self.health().await?;

        let url = self.endpoint("render")?;
        debug!(sections = script.sections.len(), "Submitting render request");

        let response = self
            .client
            .post(url)
            .timeout(self.render_timeout)
            .json(&RenderRequest {
                script,
                file_stem: &target.file_stem,
            })
            .send()
            .await
            .map_err(|e| StageError::render(format!("render request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "Render worker refused the job");
            return Err(StageError::render(format!("render worker returned {status}")));
        }

        let rendered: RenderResponse = response
            .json()
            .await
            .map_err(|e| StageError::render(format!("unexpected render response: {e}")))?;

        // Absolute URLs are kept, paths resolve against the worker.
        let download = self
            .base()?
            .join(&rendered.download_url)
            .map_err(|e| StageError::render(format!("invalid download URL: {e}")))?;

        let path = target.video_path();
        let bytes = self.download(download, &path).await?;
        if bytes == 0 {
            return Err(StageError::render("render worker produced an empty file"));
        }

        info!(
            video_id = rendered.video_id.as_deref().unwrap_or("-"),
            bytes,
            path = %path.display(),
            "Video downloaded"
        );
        Ok(path)
    }
}
