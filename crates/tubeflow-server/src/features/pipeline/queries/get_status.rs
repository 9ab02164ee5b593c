//! Get status query
//!
//! Projects the progress snapshot onto the `/status` wire format. Never
//! waits for a job and never mutates anything.

use tubeflow_common::types::{format_engagement, StatsView, StatusResponse, ENGAGEMENT_PENDING};

use crate::pipeline::framework::{ChannelStats, ProgressSnapshot, ProgressStore};

/// Query for the current pipeline status
#[derive(Debug, Clone, Copy, Default)]
pub struct GetStatusQuery;

pub fn handle(store: &ProgressStore, _query: GetStatusQuery) -> StatusResponse {
    project(&store.read())
}

/// Wire view of a snapshot
pub fn project(snapshot: &ProgressSnapshot) -> StatusResponse {
    StatusResponse {
        status: snapshot.state,
        details: snapshot.detail.clone(),
        progress: snapshot.progress,
        target_index: snapshot.target_index,
        stats: snapshot.channel_stats.as_ref().map(stats_view),
        top_videos: snapshot.top_videos.clone(),
        recent_engagement: snapshot.recent_engagement.clone(),
        recommendations: snapshot.recommendations.clone(),
        video_url: snapshot
            .target_index
            .and_then(|index| snapshot.video_artifacts.get(&index).cloned()),
        video_urls: snapshot.video_artifacts.clone(),
        last_error: snapshot.last_error.clone(),
        last_run: snapshot.last_run,
    }
}

fn stats_view(stats: &ChannelStats) -> StatsView {
    StatsView {
        channel_name: stats.name.clone(),
        channel_logo: stats.logo_url.clone(),
        subscribers: stats.subscriber_count,
        videos: stats.video_count,
        views: stats.view_count,
        engagement: stats
            .engagement_rate
            .map_or_else(|| ENGAGEMENT_PENDING.to_string(), format_engagement),
        channel_description: stats.description.clone(),
    }
}
