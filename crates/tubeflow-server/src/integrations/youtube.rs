//! YouTube Data API v3 channel source

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::pipeline::config::PipelineConfig;
use crate::pipeline::error::StageError;
use crate::pipeline::analysis;
use crate::pipeline::framework::{
    ChannelCounts, ChannelProfile, ChannelSource, CompetitorChannel, VideoRecord,
};

/// Largest page the API serves for `playlistItems` and `videos`
const PAGE_SIZE: usize = 50;

const REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    #[serde(default)]
    id: String,
    snippet: Option<ChannelSnippet>,
    statistics: Option<ChannelStatistics>,
    content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct ChannelSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    #[serde(rename = "default")]
    fallback: Option<Thumbnail>,
}

impl Thumbnails {
    fn best(&self) -> Option<&str> {
        [&self.high, &self.medium, &self.fallback]
            .into_iter()
            .flatten()
            .map(|t| t.url.as_str())
            .next()
    }
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

/// Counters arrive as decimal strings and may be missing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelStatistics {
    subscriber_count: Option<String>,
    video_count: Option<String>,
    view_count: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    content_details: Option<PlaylistItemDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemDetails {
    video_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    snippet: Option<VideoSnippet>,
    statistics: Option<VideoStatistics>,
    content_details: Option<VideoContentDetails>,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    /// ISO-8601, e.g. `PT4M13S`
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    id: SearchId,
    snippet: Option<SearchSnippet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    channel_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
    channel_id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

impl SearchItem {
    fn into_channel(self) -> Option<CompetitorChannel> {
        let snippet = self.snippet.unwrap_or_default();
        let channel_id = snippet.channel_id.or(self.id.channel_id)?;

        Some(CompetitorChannel {
            channel_id,
            title: snippet.title,
            description: snippet.description,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    #[serde(default)]
    title: String,
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

fn count(value: &Option<String>) -> u64 {
    value
        .as_deref()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

impl VideoItem {
    fn into_record(self) -> VideoRecord {
        let stats = self.statistics.unwrap_or_default();
        let (title, published_at) = match self.snippet {
            Some(snippet) => (snippet.title, snippet.published_at),
            None => (String::new(), None),
        };

        VideoRecord {
            video_id: self.id,
            title,
            published_at,
            views: count(&stats.view_count),
            likes: count(&stats.like_count),
            comments: count(&stats.comment_count),
            duration_secs: self
                .content_details
                .and_then(|details| details.duration)
                .and_then(|d| analysis::parse_iso_duration(&d)),
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// Channel source backed by the YouTube Data API
pub struct YouTubeClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl YouTubeClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, StageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("tubeflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StageError::fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, StageError> {
        Self::new(&config.youtube_api_url, config.youtube_api_key.clone())
    }

    async fn get<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, &str)],
    ) -> Result<T, StageError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| StageError::fetch("YOUTUBE_API_KEY is not configured"))?;

        let url = format!("{}/{}", self.base_url, resource);
        debug!(resource, "YouTube API request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("key", key)])
            .send()
            .await
            .map_err(|e| StageError::fetch(format!("{resource} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StageError::fetch(format!(
                "YouTube API returned {status} for {resource}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| StageError::fetch(format!("unexpected {resource} response: {e}")))
    }

    async fn channel(&self, channel_id: &str, part: &str) -> Result<ChannelItem, StageError> {
        let response: ListResponse<ChannelItem> = self
            .get("channels", &[("part", part), ("id", channel_id)])
            .await?;

        response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| StageError::fetch(format!("channel '{channel_id}' not found")))
    }

    async fn upload_ids(&self, playlist_id: &str, max_results: usize) -> Result<Vec<String>, StageError> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        while ids.len() < max_results {
            let page_size = (max_results - ids.len()).min(PAGE_SIZE).to_string();
            let mut query = vec![
                ("part", "contentDetails"),
                ("playlistId", playlist_id),
                ("maxResults", page_size.as_str()),
            ];
            if let Some(ref token) = page_token {
                query.push(("pageToken", token.as_str()));
            }

            let page: ListResponse<PlaylistItem> = self.get("playlistItems", &query).await?;
            ids.extend(
                page.items
                    .into_iter()
                    .filter_map(|item| item.content_details.map(|d| d.video_id)),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        ids.truncate(max_results);
        Ok(ids)
    }
}

#[async_trait]
impl ChannelSource for YouTubeClient {
    async fn channel_profile(&self, channel_id: &str) -> Result<ChannelProfile, StageError> {
        let item = self.channel(channel_id, "snippet").await?;
        let snippet = item.snippet.unwrap_or_default();

        Ok(ChannelProfile {
            id: if item.id.is_empty() {
                channel_id.to_string()
            } else {
                item.id
            },
            logo_url: snippet.thumbnails.best().unwrap_or_default().to_string(),
            name: snippet.title,
            description: snippet.description,
        })
    }

    async fn channel_counts(&self, channel_id: &str) -> Result<ChannelCounts, StageError> {
        let item = self.channel(channel_id, "statistics").await?;
        let stats = item.statistics.unwrap_or_default();

        Ok(ChannelCounts {
            subscriber_count: count(&stats.subscriber_count),
            video_count: count(&stats.video_count),
            view_count: count(&stats.view_count),
        })
    }

    async fn recent_videos(
        &self,
        channel_id: &str,
        max_results: usize,
    ) -> Result<Vec<VideoRecord>, StageError> {
        let item = self.channel(channel_id, "contentDetails").await?;
        let Some(uploads) = item
            .content_details
            .and_then(|details| details.related_playlists.uploads)
        else {
            return Ok(Vec::new());
        };

        let ids = self.upload_ids(&uploads, max_results).await?;
        let mut by_id: HashMap<String, VideoRecord> = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(PAGE_SIZE) {
            let joined = chunk.join(",");
            let page: ListResponse<VideoItem> = self
                .get(
                    "videos",
                    &[
                        ("part", "snippet,statistics,contentDetails"),
                        ("id", joined.as_str()),
                    ],
                )
                .await?;
            for video in page.items {
                let record = video.into_record();
                by_id.insert(record.video_id.clone(), record);
            }
        }

        // Keep the playlist order, newest upload first.
        let videos: Vec<VideoRecord> = ids.iter().filter_map(|id| by_id.remove(id)).collect();
        info!(channel_id, count = videos.len(), "Fetched upload statistics");
        Ok(videos)
    }

    async fn search_channels(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<CompetitorChannel>, StageError> {
        let max_results = max_results.min(PAGE_SIZE).to_string();
        let response: ListResponse<SearchItem> = self
            .get(
                "search",
                &[
                    ("part", "snippet"),
                    ("q", query),
                    ("type", "channel"),
                    ("maxResults", max_results.as_str()),
                ],
            )
            .await?;

        let channels: Vec<CompetitorChannel> = response
            .items
            .into_iter()
            .filter_map(SearchItem::into_channel)
            .collect();
        debug!(query, count = channels.len(), "Channel search");
        Ok(channels)
    }
}
