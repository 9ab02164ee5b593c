//! Main run: the six-stage channel analysis
//!
//! Resolves the channel, fetches its counters and uploads, ranks engagement,
//! sizes up competitor channels found through the upload titles, asks the
//! strategist for recommendations and saves them. Every stage publishes what
//! it produced as soon as it finishes.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::analysis;
use super::config::PipelineConfig;
use super::error::StageError;
use super::file_component;
use super::framework::{
    step_detail, ChannelCounts, ChannelProfile, ChannelSource, ChannelStats, Collaborators,
    Competitor, CompetitorChannel, ContentStrategist, PipelineState, ProgressSnapshot, ProgressStore, Recommendation, Stage,
    StageSequence, StageState, StepProgress, VideoEngagement, VideoRecord,
};

/// Working state of one main run
#[derive(Debug, Default)]
pub struct MainRunState {
    pub channel_id: String,
    pub profile: Option<ChannelProfile>,
    pub counts: Option<ChannelCounts>,
    pub videos: Vec<VideoRecord>,
    pub top_videos: Vec<VideoEngagement>,
    pub recent_engagement: Vec<VideoEngagement>,
    pub average_engagement: Option<f64>,
    pub competitors: Vec<Competitor>,
    pub recommendations: Option<Vec<Recommendation>>,
    pub recommendations_file: Option<PathBuf>,
}

impl MainRunState {
    pub fn new(channel_id: &str) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            ..Default::default()
        }
    }

    fn channel_name(&self) -> &str {
        self.profile
            .as_ref()
            .map_or(self.channel_id.as_str(), |p| p.name.as_str())
    }
}

impl StageState for MainRunState {
    fn publish(&self, snapshot: &mut ProgressSnapshot) {
        if let (Some(profile), Some(counts)) = (&self.profile, self.counts) {
            let mut stats = ChannelStats::new(profile, counts);
            stats.engagement_rate = self.average_engagement;
            snapshot.channel_stats = Some(stats);
        }

        snapshot.top_videos.clone_from(&self.top_videos);
        snapshot.recent_engagement.clone_from(&self.recent_engagement);

        if let Some(ref recommendations) = self.recommendations {
            if snapshot.recommendations.is_none() {
                snapshot.set_recommendations(recommendations.clone());
            }
        }
    }
}

// ============================================================================
// Stages
// ============================================================================

struct ResolveChannel {
    channels: Arc<dyn ChannelSource>,
}

#[async_trait]
impl Stage<MainRunState> for ResolveChannel {
    fn label(&self) -> &str {
        "Resolving channel identity"
    }

    async fn run(&self, state: &mut MainRunState) -> Result<(), StageError> {
        let profile = self.channels.channel_profile(&state.channel_id).await?;
        info!(channel_name = %profile.name, "Channel resolved");
        state.profile = Some(profile);
        Ok(())
    }
}

struct FetchStatistics {
    channels: Arc<dyn ChannelSource>,
}

#[async_trait]
impl Stage<MainRunState> for FetchStatistics {
    fn label(&self) -> &str {
        "Fetching channel statistics"
    }

    async fn run(&self, state: &mut MainRunState) -> Result<(), StageError> {
        let counts = self.channels.channel_counts(&state.channel_id).await?;
        info!(
            subscribers = counts.subscriber_count,
            videos = counts.video_count,
            views = counts.view_count,
            "Channel statistics fetched"
        );
        state.counts = Some(counts);
        Ok(())
    }
}

struct RankVideos {
    channels: Arc<dyn ChannelSource>,
    max_videos: usize,
    top_n: usize,
}

#[async_trait]
impl Stage<MainRunState> for RankVideos {
    fn label(&self) -> &str {
        "Fetching and ranking recent videos"
    }

    async fn run(&self, state: &mut MainRunState) -> Result<(), StageError> {
        let videos = self
            .channels
            .recent_videos(&state.channel_id, self.max_videos)
            .await?;

        if videos.is_empty() {
            return Err(StageError::NoVideos);
        }

        info!(count = videos.len(), "Uploads fetched");
        state.top_videos = analysis::top_by_engagement(&videos, self.top_n);
        state.videos = videos;
        Ok(())
    }
}

/// Title keywords searched for competitor channels
const COMPETITOR_SEARCH_KEYWORDS: usize = 5;

/// Channels taken from each keyword search
const CHANNELS_PER_KEYWORD: usize = 3;

struct EngagementTrend {
    channels: Arc<dyn ChannelSource>,
    recent_n: usize,
    max_competitors: usize,
    competitor_videos: usize,
}

impl EngagementTrend {
    /// Channels found through the uploads' title keywords, own channel excluded
    async fn discover(&self, state: &MainRunState) -> Result<Vec<CompetitorChannel>, StageError> {
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(state.channel_id.clone());
        if let Some(ref profile) = state.profile {
            seen.insert(profile.id.clone());
        }

        let mut found = Vec::new();
        for keyword in analysis::title_keywords(&state.videos, COMPETITOR_SEARCH_KEYWORDS) {
            let channels = self
                .channels
                .search_channels(&keyword, CHANNELS_PER_KEYWORD)
                .await?;
            debug!(keyword = %keyword, count = channels.len(), "Keyword search");
            found.extend(channels.into_iter().filter(|c| seen.insert(c.channel_id.clone())));
        }

        found.truncate(self.max_competitors);
        Ok(found)
    }
}

#[async_trait]
impl Stage<MainRunState> for EngagementTrend {
    fn label(&self) -> &str {
        "Computing engagement trend"
    }

    async fn run(&self, state: &mut MainRunState) -> Result<(), StageError> {
        state.recent_engagement = analysis::recent_engagement(&state.videos, self.recent_n);
        let average = analysis::average_engagement(&state.videos);
        info!(average_engagement = average, "Engagement trend computed");
        state.average_engagement = Some(average);

        if self.max_competitors == 0 {
            return Ok(());
        }

        let mut competitors = Vec::new();
        for channel in self.discover(state).await? {
            let videos = self
                .channels
                .recent_videos(&channel.channel_id, self.competitor_videos)
                .await?;
            competitors.push(Competitor { channel, videos });
        }

        info!(count = competitors.len(), "Competitor channels analyzed");
        state.competitors = competitors;
        Ok(())
    }
}

struct Recommend {
    strategist: Arc<dyn ContentStrategist>,
    top_n: usize,
}

#[async_trait]
impl Stage<MainRunState> for Recommend {
    fn label(&self) -> &str {
        "LLM agents generating strategy"
    }

    async fn run(&self, state: &mut MainRunState) -> Result<(), StageError> {
        let summary = analysis::summarize(
            state.channel_name(),
            &state.videos,
            &state.competitors,
            self.top_n,
        );
        let recommendations = self.strategist.recommend(&summary).await?;

        if recommendations.is_empty() {
            warn!("Strategist returned no recommendations");
        }

        info!(count = recommendations.len(), "Recommendations generated");
        state.recommendations = Some(recommendations);
        Ok(())
    }
}

struct SaveRecommendations {
    output_dir: PathBuf,
}

#[async_trait]
impl Stage<MainRunState> for SaveRecommendations {
    fn label(&self) -> &str {
        "Saving recommendations"
    }

    async fn run(&self, state: &mut MainRunState) -> Result<(), StageError> {
        let Some(ref recommendations) = state.recommendations else {
            warn!("No recommendations to save");
            return Ok(());
        };

        tokio::fs::create_dir_all(&self.output_dir).await?;

        let file = self.output_dir.join(format!(
            "recommendations_{}_{}.json",
            file_component(&state.channel_id),
            Utc::now().format("%Y%m%d_%H%M%S")
        ));
        let body = serde_json::to_vec_pretty(recommendations)?;
        tokio::fs::write(&file, body).await?;

        info!(path = %file.display(), "Recommendations saved");
        state.recommendations_file = Some(file);
        Ok(())
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Drives the main run against the shared progress store
pub struct PipelineRunner {
    store: ProgressStore,
    sequence: StageSequence<MainRunState>,
}

impl PipelineRunner {
    pub fn new(store: ProgressStore, collaborators: &Collaborators, config: &PipelineConfig) -> Self {
        let sequence = StageSequence::new()
            .then(ResolveChannel {
                channels: collaborators.channels.clone(),
            })
            .then(FetchStatistics {
                channels: collaborators.channels.clone(),
            })
            .then(RankVideos {
                channels: collaborators.channels.clone(),
                max_videos: config.max_videos_to_analyze,
                top_n: config.top_videos,
            })
            .then(EngagementTrend {
                channels: collaborators.channels.clone(),
                recent_n: config.recent_videos,
                max_competitors: config.max_competitors,
                competitor_videos: config.competitor_videos,
            })
            .then(Recommend {
                strategist: collaborators.strategist.clone(),
                top_n: config.top_videos,
            })
            .then(SaveRecommendations {
                output_dir: config.output_dir.clone(),
            });

        Self { store, sequence }
    }

    /// Number of stages, the `n` in `"Step k/n"`
    pub fn total_steps(&self) -> u32 {
        self.sequence.total()
    }

    /// Write the initial snapshot of a main run
    ///
    /// Clears the derived data of the previous run and enters step 1.
    pub fn begin(&self, channel_id: &str) {
        let total = self.total_steps();
        let detail = step_detail(1, total, self.sequence.label(1));
        self.store.update(|snapshot| {
            snapshot.begin_main_run(channel_id, detail, StepProgress::new(1, total));
        });
    }

    /// Run every stage and write the terminal snapshot
    ///
    /// Expects [`Self::begin`] to have been called.
    #[tracing::instrument(skip(self))]
    pub async fn execute(&self, channel_id: &str) -> Result<(), StageError> {
        let mut state = MainRunState::new(channel_id);
        let total = self.total_steps();

        match self.sequence.execute(&self.store, &mut state).await {
            Ok(()) => {
                let detail = step_detail(total, total, self.sequence.label(total));
                self.store.update(|snapshot| {
                    snapshot.state = PipelineState::Completed;
                    snapshot.target_index = None;
                    snapshot.detail = detail;
                    snapshot.progress = Some(StepProgress::new(total, total));
                    snapshot.last_run = Some(Utc::now());
                });
                info!("Main run completed");
                Ok(())
            }
            Err(failure) => {
                let detail = failure.detail("Pipeline");
                let cause = failure.error.to_string();
                self.store.update(|snapshot| snapshot.fail(detail, cause));
                warn!(step = failure.step, error = %failure.error, "Main run failed");
                Err(failure.error)
            }
        }
    }

    /// Begin and execute in one call
    pub async fn run(&self, channel_id: &str) -> Result<(), StageError> {
        self.begin(channel_id);
        self.execute(channel_id).await
    }
}
