//! Core data types shared by the pipeline stages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use tubeflow_common::types::{
    EstimatedEngagement, PipelineStatus as PipelineState, Recommendation, StepProgress,
    VideoEngagement,
};

/// Detail shown before the first run
pub const INITIAL_DETAIL: &str = "Ready to launch agents.";

// ============================================================================
// Progress Snapshot
// ============================================================================

/// The single mutable record read by pollers
///
/// Only [`super::store::ProgressStore::update`] changes it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub state: PipelineState,
    /// Human-readable stage description, `"Step k/n: label"` inside a sequence
    pub detail: String,
    pub progress: Option<StepProgress>,
    /// `None` for the main run, `Some(i)` for a selective job on recommendation `i`
    pub target_index: Option<usize>,
    pub channel_stats: Option<ChannelStats>,
    /// Ranking order
    pub top_videos: Vec<VideoEngagement>,
    /// Chronological, oldest first
    pub recent_engagement: Vec<VideoEngagement>,
    /// Write-once per main run
    pub recommendations: Option<Vec<Recommendation>>,
    pub video_artifacts: BTreeMap<usize, String>,
    pub last_error: Option<String>,
    /// Channel the derived data belongs to
    pub channel_id: Option<String>,
    /// Completion time of the last successful main run
    pub last_run: Option<DateTime<Utc>>,
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            state: PipelineState::Idle,
            detail: INITIAL_DETAIL.to_string(),
            progress: None,
            target_index: None,
            channel_stats: None,
            top_videos: Vec::new(),
            recent_engagement: Vec::new(),
            recommendations: None,
            video_artifacts: BTreeMap::new(),
            last_error: None,
            channel_id: None,
            last_run: None,
            revision: 0,
            updated_at: Utc::now(),
        }
    }
}

impl ProgressSnapshot {
    /// Reset the derived-data region for a new main run
    pub fn begin_main_run(&mut self, channel_id: &str, detail: String, progress: StepProgress) {
        self.state = PipelineState::Running;
        self.detail = detail;
        self.progress = Some(progress);
        self.target_index = None;
        self.channel_stats = None;
        self.top_videos.clear();
        self.recent_engagement.clear();
        self.recommendations = None;
        self.video_artifacts.clear();
        self.last_error = None;
        self.channel_id = Some(channel_id.to_string());
    }

    /// Publish the recommendation list
    ///
    /// Returns `false` and leaves the list untouched when it was already set
    /// during this main run.
    pub fn set_recommendations(&mut self, recommendations: Vec<Recommendation>) -> bool {
        if self.recommendations.is_some() {
            return false;
        }
        self.recommendations = Some(recommendations);
        true
    }

    /// Number of recommendations available to selective jobs
    pub fn recommendation_count(&self) -> usize {
        self.recommendations.as_ref().map_or(0, Vec::len)
    }

    /// Enter the current step of a counted sequence
    pub fn enter_step(&mut self, step: u32, total: u32, label: &str) {
        self.detail = step_detail(step, total, label);
        self.progress = Some(StepProgress::new(step, total));
    }

    /// Terminal failure, keeping every field published so far
    pub fn fail(&mut self, detail: String, cause: String) {
        self.state = PipelineState::Error;
        self.detail = detail;
        self.last_error = Some(cause);
    }
}

/// `"Step k/n: label"`
pub fn step_detail(step: u32, total: u32, label: &str) -> String {
    format!("Step {step}/{total}: {label}")
}

// ============================================================================
// Channel Data
// ============================================================================

/// Channel identity resolved by the first stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelProfile {
    pub id: String,
    pub name: String,
    pub logo_url: String,
    pub description: String,
}

/// Channel-wide counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelCounts {
    pub subscriber_count: u64,
    pub video_count: u64,
    pub view_count: u64,
}

/// Channel summary published into the snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub name: String,
    pub logo_url: String,
    pub subscriber_count: u64,
    pub video_count: u64,
    pub view_count: u64,
    /// `None` while the trend stage has not run yet
    pub engagement_rate: Option<f64>,
    pub description: String,
}

impl ChannelStats {
    pub fn new(profile: &ChannelProfile, counts: ChannelCounts) -> Self {
        Self {
            name: profile.name.clone(),
            logo_url: profile.logo_url.clone(),
            subscriber_count: counts.subscriber_count,
            video_count: counts.video_count,
            view_count: counts.view_count,
            engagement_rate: None,
            description: profile.description.clone(),
        }
    }
}

/// One uploaded video with its public counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub published_at: Option<DateTime<Utc>>,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    /// Length in seconds, `None` when the source did not report one
    #[serde(default)]
    pub duration_secs: Option<u64>,
}

/// A channel found by keyword search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorChannel {
    pub channel_id: String,
    pub title: String,
    pub description: String,
}

/// A competitor channel with its recent uploads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub channel: CompetitorChannel,
    pub videos: Vec<VideoRecord>,
}

/// Averages over a competitor's recent uploads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorSummary {
    pub channel_id: String,
    pub title: String,
    pub avg_views: f64,
    pub avg_engagement_rate: f64,
    pub video_count: usize,
    pub best_video: Option<String>,
}

/// Aggregates handed to the content strategist
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub channel_name: String,
    pub total_videos: usize,
    pub avg_views: f64,
    pub avg_engagement_rate: f64,
    pub best_video: Option<String>,
    #[serde(default)]
    pub worst_video: Option<String>,
    pub trending_topics: Vec<String>,
    pub top_videos: Vec<VideoEngagement>,
    #[serde(default)]
    pub avg_duration_secs: f64,
    /// Weekday with the highest mean engagement, e.g. `"Tuesday"`
    #[serde(default)]
    pub best_day: Option<String>,
    /// UTC hour with the highest mean engagement
    #[serde(default)]
    pub best_hour: Option<u32>,
    #[serde(default)]
    pub competitors: Vec<CompetitorSummary>,
    /// Rule-based suggestions the strategist builds on
    #[serde(default)]
    pub initial_recommendations: Vec<String>,
}

// ============================================================================
// Scripts
// ============================================================================

/// Script as written by the language model; every field may be missing
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoScript {
    #[serde(default)]
    pub video_title: Option<String>,
    #[serde(default)]
    pub sections: Vec<ScriptSection>,
    #[serde(default)]
    pub total_duration_seconds: Option<f64>,
    #[serde(default)]
    pub call_to_action: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScriptSection {
    #[serde(default)]
    pub section_title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub visual_prompt: Option<String>,
    #[serde(default)]
    pub speaking_style: Option<String>,
}

/// Production-ready script sent to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedScript {
    pub metadata: ScriptMetadata,
    pub sections: Vec<FormattedSection>,
    pub call_to_action: String,
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptMetadata {
    pub title: String,
    pub total_duration: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedSection {
    pub section_number: usize,
    pub title: String,
    pub content: String,
    pub duration: f64,
    pub visual_prompt: String,
    pub speaking_style: String,
    pub audio_file: String,
    pub image_file: String,
}

/// Where a rendered video goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTarget {
    pub output_dir: PathBuf,
    /// File name without extension
    pub file_stem: String,
}

impl RenderTarget {
    pub fn video_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.mp4", self.file_stem))
    }

    pub fn script_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_script.json", self.file_stem))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn recommendation(title: &str) -> Recommendation {
        Recommendation {
            target_title: title.to_string(),
            recommended_topic: "topic".to_string(),
            estimated_duration: "5-7 minutes".to_string(),
            estimated_engagement: EstimatedEngagement::default(),
            rationale: None,
            keywords: Vec::new(),
            content_structure: Vec::new(),
        }
    }

    #[test]
    fn test_initial_snapshot() {
        let snapshot = ProgressSnapshot::default();
        assert_eq!(snapshot.state, PipelineState::Idle);
        assert_eq!(snapshot.detail, "Ready to launch agents.");
        assert!(snapshot.recommendations.is_none());
    }

    #[test]
    fn test_recommendations_are_write_once() {
        let mut snapshot = ProgressSnapshot::default();
        assert!(snapshot.set_recommendations(vec![recommendation("a"), recommendation("b")]));
        assert!(!snapshot.set_recommendations(vec![recommendation("c")]));
        assert_eq!(snapshot.recommendation_count(), 2);
        assert_eq!(snapshot.recommendations.unwrap()[0].target_title, "a");
    }

    #[test]
    fn test_begin_main_run_clears_derived_data() {
        let mut snapshot = ProgressSnapshot::default();
        snapshot.set_recommendations(vec![recommendation("a")]);
        snapshot.video_artifacts.insert(0, "/outputs/a.mp4".to_string());
        snapshot.last_error = Some("boom".to_string());
        snapshot.target_index = Some(0);

        snapshot.begin_main_run("C1", step_detail(1, 6, "Resolving"), StepProgress::new(1, 6));

        assert_eq!(snapshot.state, PipelineState::Running);
        assert!(snapshot.recommendations.is_none());
        assert!(snapshot.video_artifacts.is_empty());
        assert!(snapshot.last_error.is_none());
        assert!(snapshot.target_index.is_none());
        assert_eq!(snapshot.channel_id.as_deref(), Some("C1"));
        assert_eq!(snapshot.detail, "Step 1/6: Resolving");
    }

    #[test]
    fn test_render_target_paths() {
        let target = RenderTarget {
            output_dir: PathBuf::from("/tmp/out"),
            file_stem: "video_c1_option_2".to_string(),
        };
        assert_eq!(target.video_path(), PathBuf::from("/tmp/out/video_c1_option_2.mp4"));
        assert_eq!(
            target.script_path(),
            PathBuf::from("/tmp/out/video_c1_option_2_script.json")
        );
    }
}
