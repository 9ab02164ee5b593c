//! Shared fixtures for Tubeflow server integration tests
//!
//! Fake collaborators stand in for YouTube, the language model and the
//! render worker, so the supervisor and HTTP layer can be driven end to end
//! without any network access. A [`Gate`] holds a fake at a known point,
//! which is how the tests keep a job active while they exercise admission.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;

use tubeflow_common::types::{EstimatedEngagement, Recommendation};
use tubeflow_server::pipeline::error::StageError;
use tubeflow_server::pipeline::framework::{
    AnalysisSummary, ChannelCounts, ChannelProfile, ChannelSource, CompetitorChannel,
    ContentStrategist, FormattedScript, RenderTarget, VideoRecord, VideoRenderer, VideoScript,
};
use tubeflow_server::pipeline::{
    script, Collaborators, JobOutcome, JobSupervisor, PipelineConfig, ProgressStore,
};

/// Channel id configured as the default in every test pipeline
pub const TEST_CHANNEL: &str = "C1";

/// Bytes the fake renderer writes for every video
pub const FAKE_VIDEO: &[u8] = b"fake mp4 bytes";

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Gate
// ============================================================================

/// Blocks fakes until the test opens it; stays open afterwards
#[derive(Clone)]
pub struct Gate(Arc<Semaphore>);

impl Gate {
    pub fn closed() -> Self {
        Self(Arc::new(Semaphore::new(0)))
    }

    pub fn open(&self) {
        self.0.add_permits(1);
    }

    async fn pass(&self) {
        // The permit goes straight back, so every later caller passes too.
        let _permit = self.0.acquire().await;
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn video(id: u32, day: u32, views: u64, likes: u64, comments: u64) -> VideoRecord {
    VideoRecord {
        video_id: format!("v{id}"),
        title: format!("Video {id}"),
        published_at: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).single(),
        views,
        likes,
        comments,
        duration_secs: None,
    }
}

/// Six uploads, newest first as the uploads playlist returns them
///
/// Engagement rates: v1 1%, v2 5%, v3 3%, v4 8%, v5 2%, v6 4%.
/// The channel average is 3.83%.
pub fn sample_videos() -> Vec<VideoRecord> {
    vec![
        video(6, 6, 1000, 40, 0),
        video(5, 5, 1000, 20, 0),
        video(4, 4, 1000, 70, 10),
        video(3, 3, 1000, 25, 5),
        video(2, 2, 1000, 50, 0),
        video(1, 1, 1000, 10, 0),
    ]
}

pub fn recommendation(title: &str) -> Recommendation {
    Recommendation {
        target_title: title.to_string(),
        recommended_topic: format!("{title} topic"),
        estimated_duration: "8 minutes".to_string(),
        estimated_engagement: EstimatedEngagement {
            expected_views: "10k-20k".to_string(),
            engagement_rate: "4-6%".to_string(),
        },
        rationale: Some("Similar videos performed well".to_string()),
        keywords: vec!["tutorial".to_string()],
        content_structure: vec!["Hook".to_string(), "Body".to_string()],
    }
}

pub fn sample_recommendations() -> Vec<Recommendation> {
    vec![
        recommendation("Option A"),
        recommendation("Option B"),
        recommendation("Option C"),
    ]
}

// ============================================================================
// Fake Collaborators
// ============================================================================

/// Channel source serving a fixed set of uploads
///
/// Every keyword search returns all registered competitors.
#[derive(Default)]
pub struct FakeChannels {
    videos: Vec<VideoRecord>,
    competitors: Vec<(CompetitorChannel, Vec<VideoRecord>)>,
    gate: Option<Gate>,
    fail_profile: bool,
    fail_search: bool,
    pub profile_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
}

impl FakeChannels {
    pub fn with_videos(videos: Vec<VideoRecord>) -> Self {
        Self {
            videos,
            ..Default::default()
        }
    }

    /// Hold `channel_profile` (stage 1) until the gate opens
    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_profile = true;
        self
    }

    pub fn with_competitor(mut self, id: &str, title: &str, videos: Vec<VideoRecord>) -> Self {
        let channel = CompetitorChannel {
            channel_id: id.to_string(),
            title: title.to_string(),
            description: format!("{title} description"),
        };
        self.competitors.push((channel, videos));
        self
    }

    /// Fail every keyword search (main run step 4)
    pub fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }
}

#[async_trait]
impl ChannelSource for FakeChannels {
    async fn channel_profile(&self, channel_id: &str) -> Result<ChannelProfile, StageError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref gate) = self.gate {
            gate.pass().await;
        }
        if self.fail_profile {
            return Err(StageError::fetch("channel lookup refused"));
        }

        Ok(ChannelProfile {
            id: channel_id.to_string(),
            name: "Test Channel".to_string(),
            logo_url: "https://img.example.com/logo.jpg".to_string(),
            description: "A channel used in tests".to_string(),
        })
    }

    async fn channel_counts(&self, _channel_id: &str) -> Result<ChannelCounts, StageError> {
        Ok(ChannelCounts {
            subscriber_count: 1200,
            video_count: self.videos.len() as u64,
            view_count: self.videos.iter().map(|v| v.views).sum(),
        })
    }

    async fn recent_videos(
        &self,
        channel_id: &str,
        max_results: usize,
    ) -> Result<Vec<VideoRecord>, StageError> {
        let videos = self
            .competitors
            .iter()
            .find(|(channel, _)| channel.channel_id == channel_id && channel_id != TEST_CHANNEL)
            .map_or(&self.videos, |(_, videos)| videos);
        Ok(videos.iter().take(max_results).cloned().collect())
    }

    async fn search_channels(
        &self,
        _query: &str,
        max_results: usize,
    ) -> Result<Vec<CompetitorChannel>, StageError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_search {
            return Err(StageError::fetch("search quota exceeded"));
        }
        Ok(self
            .competitors
            .iter()
            .take(max_results)
            .map(|(channel, _)| channel.clone())
            .collect())
    }
}

/// Strategist returning canned recommendations and scripts
pub struct FakeStrategist {
    recommendations: Vec<Recommendation>,
    fail_recommend: bool,
    fail_script: bool,
    summaries: Arc<Mutex<Vec<AnalysisSummary>>>,
    pub script_calls: AtomicUsize,
}

impl FakeStrategist {
    pub fn new() -> Self {
        Self {
            recommendations: sample_recommendations(),
            fail_recommend: false,
            fail_script: false,
            summaries: Arc::default(),
            script_calls: AtomicUsize::new(0),
        }
    }

    /// Every summary passed to `recommend`, shared with the caller
    pub fn summaries(&self) -> Arc<Mutex<Vec<AnalysisSummary>>> {
        self.summaries.clone()
    }

    pub fn with_recommendations(mut self, recommendations: Vec<Recommendation>) -> Self {
        self.recommendations = recommendations;
        self
    }

    pub fn failing_recommend(mut self) -> Self {
        self.fail_recommend = true;
        self
    }

    pub fn failing_script(mut self) -> Self {
        self.fail_script = true;
        self
    }
}

#[async_trait]
impl ContentStrategist for FakeStrategist {
    async fn recommend(
        &self,
        summary: &AnalysisSummary,
    ) -> Result<Vec<Recommendation>, StageError> {
        self.summaries.lock().unwrap().push(summary.clone());
        if self.fail_recommend {
            return Err(StageError::inference("model offline"));
        }
        Ok(self.recommendations.clone())
    }

    async fn write_script(
        &self,
        recommendation: &Recommendation,
    ) -> Result<VideoScript, StageError> {
        self.script_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_script {
            return Err(StageError::inference("model offline"));
        }
        Ok(script::fallback_script(recommendation))
    }
}

enum RenderBehavior {
    Write,
    Fail,
    Panic,
}

/// Renderer writing [`FAKE_VIDEO`] to the target path
pub struct FakeRenderer {
    behavior: RenderBehavior,
    gate: Option<Gate>,
    pub renders: AtomicUsize,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self {
            behavior: RenderBehavior::Write,
            gate: None,
            renders: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            behavior: RenderBehavior::Fail,
            ..Self::new()
        }
    }

    pub fn panicking() -> Self {
        Self {
            behavior: RenderBehavior::Panic,
            ..Self::new()
        }
    }

    /// Hold the render stage (selective step 3) until the gate opens
    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl VideoRenderer for FakeRenderer {
    async fn render(
        &self,
        _script: &FormattedScript,
        target: &RenderTarget,
    ) -> Result<PathBuf, StageError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if let Some(ref gate) = self.gate {
            gate.pass().await;
        }

        match self.behavior {
            RenderBehavior::Write => {
                let path = target.video_path();
                tokio::fs::write(&path, FAKE_VIDEO).await?;
                Ok(path)
            }
            RenderBehavior::Fail => Err(StageError::render("encoder exited with status 1")),
            RenderBehavior::Panic => panic!("encoder crashed"),
        }
    }
}

pub fn collaborators(
    channels: FakeChannels,
    strategist: FakeStrategist,
    renderer: FakeRenderer,
) -> Collaborators {
    Collaborators::new(Arc::new(channels), Arc::new(strategist), Arc::new(renderer))
}

/// Fakes that succeed at every stage
pub fn happy_collaborators() -> Collaborators {
    collaborators(
        FakeChannels::with_videos(sample_videos()),
        FakeStrategist::new(),
        FakeRenderer::new(),
    )
}

// ============================================================================
// Test Pipeline
// ============================================================================

/// A running supervisor writing into a temporary output directory
pub struct TestPipeline {
    pub supervisor: JobSupervisor,
    pub config: Arc<PipelineConfig>,
    pub worker: JoinHandle<()>,
    pub outputs: TempDir,
}

impl TestPipeline {
    pub fn start(collaborators: Collaborators) -> Self {
        Self::start_with(collaborators, |_| {})
    }

    /// Start with a tweaked configuration
    pub fn start_with(
        collaborators: Collaborators,
        configure: impl FnOnce(&mut PipelineConfig),
    ) -> Self {
        let outputs = TempDir::new().expect("Failed to create output dir");
        let mut config = test_config(&outputs);
        configure(&mut config);
        let config = Arc::new(config);

        let (supervisor, worker) =
            JobSupervisor::start(ProgressStore::new(), collaborators, config.clone());

        Self {
            supervisor,
            config,
            worker,
            outputs,
        }
    }

    pub fn store(&self) -> &ProgressStore {
        self.supervisor.store()
    }

    /// Run the main pipeline on the default channel and wait for it
    pub async fn run_main(&self) -> JobOutcome {
        let mut outcomes = self.supervisor.subscribe_outcomes();
        self.supervisor
            .start_main(None)
            .expect("Main run was not accepted");
        next_outcome(&mut outcomes).await
    }

    /// Run a selective job and wait for it
    pub async fn run_selective(&self, index: i64) -> JobOutcome {
        let mut outcomes = self.supervisor.subscribe_outcomes();
        self.supervisor
            .start_selective(index)
            .expect("Selective job was not accepted");
        next_outcome(&mut outcomes).await
    }
}

pub fn test_config(outputs: &TempDir) -> PipelineConfig {
    PipelineConfig {
        default_channel_id: Some(TEST_CHANNEL.to_string()),
        output_dir: outputs.path().to_path_buf(),
        ..Default::default()
    }
}

/// The next finished job, failing the test after a timeout
pub async fn next_outcome(outcomes: &mut broadcast::Receiver<JobOutcome>) -> JobOutcome {
    tokio::time::timeout(WAIT_TIMEOUT, outcomes.recv())
        .await
        .expect("Timed out waiting for a job outcome")
        .expect("Outcome channel closed")
}

/// Await `future`, failing the test after a timeout
pub async fn within<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(WAIT_TIMEOUT, future)
        .await
        .expect("Timed out")
}
