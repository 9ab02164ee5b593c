//! Pipeline configuration
//!
//! Settings for the stages and their default collaborators, read from the
//! environment with the defaults below.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default YouTube Data API base URL.
pub const DEFAULT_YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Default number of uploads fetched for analysis.
pub const DEFAULT_MAX_VIDEOS_TO_ANALYZE: usize = 50;

/// Default size of the top-videos ranking.
pub const DEFAULT_TOP_VIDEOS: usize = 5;

/// Default size of the recent-engagement trend.
pub const DEFAULT_RECENT_VIDEOS: usize = 5;

/// Default number of competitor channels analyzed; 0 disables discovery.
pub const DEFAULT_MAX_COMPETITORS: usize = 5;

/// Default number of uploads fetched per competitor.
pub const DEFAULT_COMPETITOR_VIDEOS: usize = 20;

/// Default Ollama host.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Default language model.
pub const DEFAULT_LLM_MODEL: &str = "gemma3:270m";

/// Default language model request timeout in seconds.
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 500;

/// Default render request timeout in seconds.
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 300;

/// Default directory for rendered artifacts.
pub const DEFAULT_OUTPUT_DIR: &str = "./outputs";

/// Default URL prefix the output directory is served under.
pub const DEFAULT_OUTPUTS_URL_PREFIX: &str = "/outputs";

/// Default duration of a script section without one, in seconds.
pub const DEFAULT_SECTION_DURATION_SECS: f64 = 10.0;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Channel used when `/start` names none
    pub default_channel_id: Option<String>,
    /// YouTube Data API key
    pub youtube_api_key: Option<String>,
    /// YouTube Data API base URL
    pub youtube_api_url: String,
    /// Uploads fetched for analysis
    pub max_videos_to_analyze: usize,
    /// Size of the top-videos ranking
    pub top_videos: usize,
    /// Size of the recent-engagement trend
    pub recent_videos: usize,
    /// Competitor channels analyzed, 0 to skip discovery
    pub max_competitors: usize,
    /// Uploads fetched per competitor
    pub competitor_videos: usize,
    /// Ollama host, always with a scheme
    pub ollama_host: String,
    /// Model name passed to Ollama
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    /// Render worker base URL
    pub render_worker_url: Option<String>,
    pub render_timeout_secs: u64,
    /// Directory rendered videos and scripts are written to
    pub output_dir: PathBuf,
    /// URL prefix the output directory is served under
    pub outputs_url_prefix: String,
    /// Duration given to script sections without one
    pub section_duration_secs: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_channel_id: None,
            youtube_api_key: None,
            youtube_api_url: DEFAULT_YOUTUBE_API_URL.to_string(),
            max_videos_to_analyze: DEFAULT_MAX_VIDEOS_TO_ANALYZE,
            top_videos: DEFAULT_TOP_VIDEOS,
            recent_videos: DEFAULT_RECENT_VIDEOS,
            max_competitors: DEFAULT_MAX_COMPETITORS,
            competitor_videos: DEFAULT_COMPETITOR_VIDEOS,
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            render_worker_url: None,
            render_timeout_secs: DEFAULT_RENDER_TIMEOUT_SECS,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            outputs_url_prefix: DEFAULT_OUTPUTS_URL_PREFIX.to_string(),
            section_duration_secs: DEFAULT_SECTION_DURATION_SECS,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl PipelineConfig {
    /// Load pipeline configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            default_channel_id: non_empty_var("CHANNEL_ID"),
            youtube_api_key: non_empty_var("YOUTUBE_API_KEY"),
            youtube_api_url: non_empty_var("YOUTUBE_API_URL")
                .unwrap_or_else(|| DEFAULT_YOUTUBE_API_URL.to_string()),
            max_videos_to_analyze: parsed_var(
                "MAX_VIDEOS_TO_ANALYZE",
                DEFAULT_MAX_VIDEOS_TO_ANALYZE,
            ),
            top_videos: parsed_var("TOP_VIDEOS", DEFAULT_TOP_VIDEOS),
            recent_videos: parsed_var("RECENT_VIDEOS", DEFAULT_RECENT_VIDEOS),
            max_competitors: parsed_var("MAX_COMPETITORS", DEFAULT_MAX_COMPETITORS),
            competitor_videos: parsed_var("COMPETITOR_VIDEOS", DEFAULT_COMPETITOR_VIDEOS),
            ollama_host: normalize_host(
                &non_empty_var("OLLAMA_HOST").unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string()),
            ),
            llm_model: non_empty_var("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_timeout_secs: parsed_var("LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS),
            render_worker_url: non_empty_var("RENDER_WORKER_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            render_timeout_secs: parsed_var("RENDER_TIMEOUT_SECS", DEFAULT_RENDER_TIMEOUT_SECS),
            output_dir: non_empty_var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            outputs_url_prefix: non_empty_var("OUTPUTS_URL_PREFIX")
                .unwrap_or_else(|| DEFAULT_OUTPUTS_URL_PREFIX.to_string()),
            section_duration_secs: parsed_var(
                "SECTION_DURATION_SECS",
                DEFAULT_SECTION_DURATION_SECS,
            ),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_videos_to_analyze == 0 {
            anyhow::bail!("MAX_VIDEOS_TO_ANALYZE must be greater than 0");
        }

        if self.top_videos == 0 || self.recent_videos == 0 {
            anyhow::bail!("TOP_VIDEOS and RECENT_VIDEOS must be greater than 0");
        }

        if self.max_competitors > 0 && self.competitor_videos == 0 {
            anyhow::bail!("COMPETITOR_VIDEOS must be greater than 0 when MAX_COMPETITORS is set");
        }

        if !self.outputs_url_prefix.starts_with('/') || self.outputs_url_prefix == "/" {
            anyhow::bail!(
                "OUTPUTS_URL_PREFIX must start with '/' and name a path, got '{}'",
                self.outputs_url_prefix
            );
        }

        if self.section_duration_secs.is_nan() || self.section_duration_secs <= 0.0 {
            anyhow::bail!("SECTION_DURATION_SECS must be positive");
        }

        url::Url::parse(&self.youtube_api_url)
            .map_err(|e| anyhow::anyhow!("Invalid YOUTUBE_API_URL: {e}"))?;
        url::Url::parse(&self.ollama_host)
            .map_err(|e| anyhow::anyhow!("Invalid OLLAMA_HOST: {e}"))?;
        if let Some(ref worker) = self.render_worker_url {
            url::Url::parse(worker).map_err(|e| anyhow::anyhow!("Invalid RENDER_WORKER_URL: {e}"))?;
        }

        if self.youtube_api_key.is_none() {
            tracing::warn!("YOUTUBE_API_KEY is not set - channel fetches will fail");
        }

        if self.render_worker_url.is_none() {
            tracing::warn!("RENDER_WORKER_URL is not set - video rendering will fail");
        }

        Ok(())
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    /// Public URL of a file inside the output directory
    pub fn output_url(&self, file_name: &str) -> String {
        format!(
            "{}/{}",
            self.outputs_url_prefix.trim_end_matches('/'),
            file_name
        )
    }
}

/// Prefix `http://` when the host has no scheme
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("localhost:11434"), "http://localhost:11434");
        assert_eq!(normalize_host("https://ollama.internal/"), "https://ollama.internal");
    }

    #[test]
    fn test_output_url() {
        let config = PipelineConfig {
            outputs_url_prefix: "/outputs/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.output_url("a.mp4"), "/outputs/a.mp4");
    }

    #[test]
    fn test_validate_rejects_root_prefix() {
        let config = PipelineConfig {
            outputs_url_prefix: "/".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_validate() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm_model, "gemma3:270m");
        assert_eq!(config.max_videos_to_analyze, 50);
        assert_eq!(config.max_competitors, 5);
        assert_eq!(config.competitor_videos, 20);
    }

    #[test]
    fn test_validate_rejects_empty_competitor_fetch() {
        let config = PipelineConfig {
            competitor_videos: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let disabled = PipelineConfig {
            max_competitors: 0,
            competitor_videos: 0,
            ..Default::default()
        };
        assert!(disabled.validate().is_ok());
    }
}
