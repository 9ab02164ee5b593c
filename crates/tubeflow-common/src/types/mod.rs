//! Wire types shared by the Tubeflow server and its polling clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::TubeflowError;

// ============================================================================
// Pipeline State
// ============================================================================

/// The single process-wide pipeline state
///
/// Serialized with exactly these spellings; clients match on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PipelineStatus {
    #[default]
    Idle,
    Running,
    GeneratingVideo,
    Completed,
    Error,
}

impl PipelineStatus {
    /// `Completed` and `Error` are quiescent: only a new start request moves on from them.
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStatus::Completed | PipelineStatus::Error)
    }

    /// Whether a job currently holds the pipeline
    pub fn is_active(self) -> bool {
        matches!(self, PipelineStatus::Running | PipelineStatus::GeneratingVideo)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStatus::Idle => "Idle",
            PipelineStatus::Running => "Running",
            PipelineStatus::GeneratingVideo => "GeneratingVideo",
            PipelineStatus::Completed => "Completed",
            PipelineStatus::Error => "Error",
        }
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PipelineStatus {
    type Err = TubeflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Idle" => Ok(PipelineStatus::Idle),
            "Running" => Ok(PipelineStatus::Running),
            "GeneratingVideo" => Ok(PipelineStatus::GeneratingVideo),
            "Completed" => Ok(PipelineStatus::Completed),
            "Error" => Ok(PipelineStatus::Error),
            other => Err(TubeflowError::InvalidStatus(other.to_string())),
        }
    }
}

/// Structured step counter carried next to the human-readable `"Step k/n"` detail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepProgress {
    pub current: u32,
    pub total: u32,
    /// Whole percent, `current * 100 / total`
    pub percent: u8,
}

impl StepProgress {
    pub fn new(current: u32, total: u32) -> Self {
        let current = current.min(total);
        let percent = if total == 0 {
            0
        } else {
            (u64::from(current) * 100 / u64::from(total)) as u8
        };
        Self {
            current,
            total,
            percent,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.current == self.total
    }
}

impl std::fmt::Display for StepProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.current, self.total)
    }
}

// ============================================================================
// Derived Data
// ============================================================================

/// Per-video engagement, used for both the top ranking and the recent trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoEngagement {
    pub title: String,
    pub engagement_rate: f64,
}

/// Predicted reach of a recommendation, as free-form ranges ("10k-20k", "5-8%")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EstimatedEngagement {
    #[serde(rename = "Expected views", default)]
    pub expected_views: String,
    #[serde(rename = "Engagement rate", default)]
    pub engagement_rate: String,
}

/// A recommended follow-up video, immutable once produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub target_title: String,
    pub recommended_topic: String,
    pub estimated_duration: String,
    #[serde(default)]
    pub estimated_engagement: EstimatedEngagement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_structure: Vec<String>,
}

/// Channel summary as shown to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsView {
    pub channel_name: String,
    pub channel_logo: String,
    pub subscribers: u64,
    pub videos: u64,
    pub views: u64,
    /// Average engagement as a percentage with two decimals ("4.20%"),
    /// or `"Calculating..."` until the trend stage has run
    pub engagement: String,
    pub channel_description: String,
}

/// Placeholder shown before the channel average is known
pub const ENGAGEMENT_PENDING: &str = "Calculating...";

/// Format an engagement ratio (0.042) as a percentage string ("4.20%")
pub fn format_engagement(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

// ============================================================================
// API Payloads
// ============================================================================

/// Body of `GET /status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: PipelineStatus,
    pub details: String,
    #[serde(default)]
    pub progress: Option<StepProgress>,
    #[serde(default)]
    pub target_index: Option<usize>,
    #[serde(default)]
    pub stats: Option<StatsView>,
    #[serde(default)]
    pub top_videos: Vec<VideoEngagement>,
    #[serde(default)]
    pub recent_engagement: Vec<VideoEngagement>,
    #[serde(default)]
    pub recommendations: Option<Vec<Recommendation>>,
    /// Artifact of `target_index`, absent for the main run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default)]
    pub video_urls: BTreeMap<usize, String>,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
}

/// Body of `POST /start`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    #[serde(default, alias = "channelId", skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

/// Body of `POST /generate_selected`
///
/// Signed so a negative index reaches the server as an out-of-range index
/// instead of failing to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub index: i64,
}

/// Acknowledgement returned by accepted start requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Polling
// ============================================================================

/// The job a poller is bound to
///
/// A poller stops only on a terminal snapshot that belongs to its own job.
/// Terminal snapshots left behind by another job (or by the previous run)
/// never end the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTarget {
    /// The six-stage main run (`target_index == null`)
    MainRun,
    /// The selective regeneration of one recommendation
    Selective(usize),
}

impl PollTarget {
    /// The `target_index` a snapshot of this job carries
    pub fn target_index(self) -> Option<usize> {
        match self {
            PollTarget::MainRun => None,
            PollTarget::Selective(index) => Some(index),
        }
    }

    /// Whether the snapshot describes this job
    pub fn owns(self, snapshot: &StatusResponse) -> bool {
        snapshot.target_index == self.target_index()
    }

    /// Whether polling for this job can stop
    pub fn is_finished(self, snapshot: &StatusResponse) -> bool {
        snapshot.status.is_terminal() && self.owns(snapshot)
    }
}

impl std::fmt::Display for PollTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollTarget::MainRun => write!(f, "main run"),
            PollTarget::Selective(index) => write!(f, "video for option {}", index + 1),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot(status: PipelineStatus, target_index: Option<usize>) -> StatusResponse {
        StatusResponse {
            status,
            details: String::new(),
            progress: None,
            target_index,
            stats: None,
            top_videos: Vec::new(),
            recent_engagement: Vec::new(),
            recommendations: None,
            video_url: None,
            video_urls: BTreeMap::new(),
            last_error: None,
            last_run: None,
        }
    }

    fn any_status() -> impl Strategy<Value = PipelineStatus> {
        prop_oneof![
            Just(PipelineStatus::Idle),
            Just(PipelineStatus::Running),
            Just(PipelineStatus::GeneratingVideo),
            Just(PipelineStatus::Completed),
            Just(PipelineStatus::Error),
        ]
    }

    #[test]
    fn test_status_spelling() {
        let json = serde_json::to_string(&PipelineStatus::GeneratingVideo).unwrap();
        assert_eq!(json, "\"GeneratingVideo\"");
        assert_eq!("Error".parse::<PipelineStatus>().unwrap(), PipelineStatus::Error);
        assert!(matches!(
            "Failed".parse::<PipelineStatus>(),
            Err(TubeflowError::InvalidStatus(_))
        ));
    }

    #[test]
    fn test_step_progress_percent() {
        assert_eq!(StepProgress::new(2, 6).percent, 33);
        assert_eq!(StepProgress::new(6, 6).percent, 100);
        assert!(StepProgress::new(6, 6).is_complete());
        assert_eq!(StepProgress::new(9, 4).current, 4);
        assert_eq!(StepProgress::new(0, 0).percent, 0);
    }

    #[test]
    fn test_format_engagement() {
        assert_eq!(format_engagement(0.042), "4.20%");
        assert_eq!(format_engagement(0.0), "0.00%");
    }

    #[test]
    fn test_recommendation_uses_display_keys() {
        let json = serde_json::json!({
            "target_title": "Rust in 100 Seconds",
            "recommended_topic": "Rust basics",
            "estimated_duration": "5-7 minutes",
            "estimated_engagement": {"Expected views": "10k-20k", "Engagement rate": "5-8%"}
        });
        let rec: Recommendation = serde_json::from_value(json).unwrap();
        assert_eq!(rec.estimated_engagement.expected_views, "10k-20k");
        assert!(rec.keywords.is_empty());

        let back = serde_json::to_value(&rec).unwrap();
        assert_eq!(back["estimated_engagement"]["Engagement rate"], "5-8%");
        assert!(back.get("rationale").is_none());
    }

    #[test]
    fn test_start_request_accepts_camel_case_alias() {
        let req: StartRequest = serde_json::from_str(r#"{"channelId": "C1"}"#).unwrap();
        assert_eq!(req.channel_id.as_deref(), Some("C1"));

        let empty: StartRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.channel_id.is_none());
    }

    #[test]
    fn test_status_response_wire_shape() {
        let mut status = snapshot(PipelineStatus::Completed, Some(1));
        status.video_urls.insert(1, "/outputs/c1_option_2.mp4".to_string());

        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["status"], "Completed");
        assert_eq!(value["video_urls"]["1"], "/outputs/c1_option_2.mp4");
        assert!(value["recommendations"].is_null());
        assert!(value.get("video_url").is_none());

        let parsed: StatusResponse = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, status);
    }

    #[test]
    fn test_main_run_ignores_selective_terminal_snapshot() {
        let leftover = snapshot(PipelineStatus::Completed, Some(2));
        assert!(!PollTarget::MainRun.is_finished(&leftover));
        assert!(PollTarget::Selective(2).is_finished(&leftover));
    }

    #[test]
    fn test_selective_ignores_previous_main_run() {
        let previous = snapshot(PipelineStatus::Completed, None);
        assert!(!PollTarget::Selective(0).is_finished(&previous));
        assert!(PollTarget::MainRun.is_finished(&previous));
    }

    proptest! {
        #[test]
        fn prop_active_snapshots_never_finish(index in 0usize..16, target in proptest::option::of(0usize..16)) {
            for status in [PipelineStatus::Idle, PipelineStatus::Running, PipelineStatus::GeneratingVideo] {
                let s = snapshot(status, target);
                prop_assert!(!PollTarget::MainRun.is_finished(&s));
                prop_assert!(!PollTarget::Selective(index).is_finished(&s));
            }
        }

        #[test]
        fn prop_other_jobs_never_finish_a_poller(status in any_status(), mine in 0usize..16, other in 0usize..16) {
            prop_assume!(mine != other);
            let s = snapshot(status, Some(other));
            prop_assert!(!PollTarget::Selective(mine).is_finished(&s));
            prop_assert!(!PollTarget::MainRun.is_finished(&s));
        }

        #[test]
        fn prop_own_terminal_snapshot_finishes(index in 0usize..16, failed in any::<bool>()) {
            let status = if failed { PipelineStatus::Error } else { PipelineStatus::Completed };
            prop_assert!(PollTarget::Selective(index).is_finished(&snapshot(status, Some(index))));
            prop_assert!(PollTarget::MainRun.is_finished(&snapshot(status, None)));
        }

        #[test]
        fn prop_percent_is_bounded(current in 0u32..100, total in 0u32..100) {
            let progress = StepProgress::new(current, total);
            prop_assert!(progress.percent <= 100);
            prop_assert!(progress.current <= progress.total);
        }
    }
}
