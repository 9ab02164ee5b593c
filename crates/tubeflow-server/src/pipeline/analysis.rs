//! Engagement analysis over a channel's uploads
//!
//! Pure functions; the stages call them on data already fetched.

use chrono::{DateTime, Datelike, Timelike, Utc};
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use super::framework::{
    AnalysisSummary, Competitor, CompetitorSummary, VideoEngagement, VideoRecord,
};

/// Number of title keywords handed to the strategist
pub const TRENDING_KEYWORDS: usize = 10;

/// Length assumed for videos without a usable duration
pub const DEFAULT_VIDEO_DURATION_SECS: u64 = 300;

/// Views quantile below which a video cannot be the worst performer
const WORST_VIDEO_VIEWS_QUANTILE: f64 = 0.1;

const STOP_WORDS: &[&str] = &[
    "the", "and", "a", "an", "in", "on", "at", "to", "for", "of", "with", "by", "is", "was",
    "are", "were", "be", "been", "being",
];

/// `(likes + comments) / max(views, 1)`
pub fn engagement_rate(video: &VideoRecord) -> f64 {
    (video.likes + video.comments) as f64 / video.views.max(1) as f64
}

/// Mean engagement rate across all videos, 0 when there are none
pub fn average_engagement(videos: &[VideoRecord]) -> f64 {
    if videos.is_empty() {
        return 0.0;
    }
    videos.iter().map(engagement_rate).sum::<f64>() / videos.len() as f64
}

/// Mean view count, 0 when there are no videos
pub fn average_views(videos: &[VideoRecord]) -> f64 {
    if videos.is_empty() {
        return 0.0;
    }
    videos.iter().map(|v| v.views as f64).sum::<f64>() / videos.len() as f64
}

/// The `n` most engaging videos, best first
///
/// The sort is stable, so ties keep upload order.
pub fn top_by_engagement(videos: &[VideoRecord], n: usize) -> Vec<VideoEngagement> {
    let mut ranked: Vec<(f64, &VideoRecord)> =
        videos.iter().map(|v| (engagement_rate(v), v)).collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    ranked
        .into_iter()
        .take(n)
        .map(|(rate, v)| VideoEngagement {
            title: v.title.clone(),
            engagement_rate: rate,
        })
        .collect()
}

/// The `n` most recent videos, oldest first
///
/// Videos without a publish date sort before dated ones.
pub fn recent_engagement(videos: &[VideoRecord], n: usize) -> Vec<VideoEngagement> {
    let mut dated: Vec<&VideoRecord> = videos.iter().collect();
    dated.sort_by_key(|v| v.published_at);

    let skip = dated.len().saturating_sub(n);
    dated
        .into_iter()
        .skip(skip)
        .map(|v| VideoEngagement {
            title: v.title.clone(),
            engagement_rate: engagement_rate(v),
        })
        .collect()
}

/// Most frequent title words of at least three letters, stop-words removed
///
/// Ties are broken by first appearance.
pub fn title_keywords(videos: &[VideoRecord], limit: usize) -> Vec<String> {
    static WORD: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(word) = WORD.get_or_init(|| Regex::new(r"\b[a-zA-Z]{3,}\b").ok()) else {
        return Vec::new();
    };

    let stop: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut order = 0;

    for video in videos {
        let title = video.title.to_lowercase();
        for m in word.find_iter(&title) {
            let w = m.as_str();
            if stop.contains(w) {
                continue;
            }
            let entry = counts.entry(w.to_string()).or_insert((0, order));
            entry.0 += 1;
            order += 1;
        }
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().take(limit).map(|(w, _)| w).collect()
}

/// Best video by the composite of views, likes and comments, each scaled to the channel maximum
pub fn best_video(videos: &[VideoRecord]) -> Option<&VideoRecord> {
    let max_views = videos.iter().map(|v| v.views).max()?.max(1) as f64;
    let max_likes = videos.iter().map(|v| v.likes).max()?.max(1) as f64;
    let max_comments = videos.iter().map(|v| v.comments).max()?.max(1) as f64;

    let score = |v: &VideoRecord| {
        v.views as f64 / max_views * 0.4
            + v.likes as f64 / max_likes * 0.3
            + v.comments as f64 / max_comments * 0.3
    };

    videos.iter().max_by(|a, b| score(a).total_cmp(&score(b)))
}

/// Lowest engagement among videos with more views than the 10th percentile
///
/// Keeps barely watched uploads from counting as the worst performer. When
/// the percentile is zero, or no video clears it, every video is considered.
pub fn worst_video(videos: &[VideoRecord]) -> Option<&VideoRecord> {
    let threshold = views_quantile(videos, WORST_VIDEO_VIEWS_QUANTILE)?;
    if threshold > 0.0 {
        let above = videos.iter().filter(|v| v.views as f64 > threshold);
        if let Some(worst) = lowest_engagement(above) {
            return Some(worst);
        }
    }
    lowest_engagement(videos.iter())
}

/// First video with the minimum engagement rate
fn lowest_engagement<'a>(
    candidates: impl Iterator<Item = &'a VideoRecord>,
) -> Option<&'a VideoRecord> {
    candidates.min_by(|a, b| engagement_rate(a).total_cmp(&engagement_rate(b)))
}

/// Linearly interpolated quantile of the view counts
fn views_quantile(videos: &[VideoRecord], q: f64) -> Option<f64> {
    let mut views: Vec<u64> = videos.iter().map(|v| v.views).collect();
    views.sort_unstable();

    let last = views.len().checked_sub(1)?;
    let position = last as f64 * q;
    let lo = position.floor() as usize;
    let hi = position.ceil() as usize;
    let (low, high) = (views[lo] as f64, views[hi] as f64);
    Some(low + (high - low) * (position - lo as f64))
}

/// Seconds in an ISO-8601 duration such as `PT1H2M3S`
///
/// Only the hour, minute and second designators are understood.
pub fn parse_iso_duration(duration: &str) -> Option<u64> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").ok())
        .as_ref()?;

    let caps = pattern.captures(duration.trim())?;
    let part = |i: usize| -> u64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    Some(part(1) * 3600 + part(2) * 60 + part(3))
}

/// Mean length in seconds, unknown durations counted as the default
pub fn average_duration(videos: &[VideoRecord]) -> f64 {
    if videos.is_empty() {
        return DEFAULT_VIDEO_DURATION_SECS as f64;
    }
    let total: u64 = videos
        .iter()
        .map(|v| v.duration_secs.unwrap_or(DEFAULT_VIDEO_DURATION_SECS))
        .sum();
    total as f64 / videos.len() as f64
}

/// Bucket with the highest mean engagement; the lowest key wins ties
fn best_bucket<K: Ord + Copy>(
    videos: &[VideoRecord],
    key: impl Fn(&DateTime<Utc>) -> K,
) -> Option<K> {
    let mut buckets: BTreeMap<K, (f64, usize)> = BTreeMap::new();
    for video in videos {
        let Some(ref published) = video.published_at else {
            continue;
        };
        let bucket = buckets.entry(key(published)).or_insert((0.0, 0));
        bucket.0 += engagement_rate(video);
        bucket.1 += 1;
    }

    let mut best: Option<(K, f64)> = None;
    for (k, (sum, n)) in buckets {
        let mean = sum / n as f64;
        if best.map_or(true, |(_, top)| mean > top) {
            best = Some((k, mean));
        }
    }
    best.map(|(k, _)| k)
}

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Weekday whose uploads engage best, Monday first on ties
pub fn best_publish_day(videos: &[VideoRecord]) -> Option<&'static str> {
    best_bucket(videos, |t| t.weekday().num_days_from_monday())
        .and_then(|n| DAY_NAMES.get(n as usize).copied())
}

/// UTC hour whose uploads engage best, earliest first on ties
pub fn best_publish_hour(videos: &[VideoRecord]) -> Option<u32> {
    best_bucket(videos, |t| t.hour())
}

/// Averages over a competitor's uploads, `None` when it has none
pub fn competitor_summary(competitor: &Competitor) -> Option<CompetitorSummary> {
    if competitor.videos.is_empty() {
        return None;
    }

    Some(CompetitorSummary {
        channel_id: competitor.channel.channel_id.clone(),
        title: competitor.channel.title.clone(),
        avg_views: average_views(&competitor.videos),
        avg_engagement_rate: average_engagement(&competitor.videos),
        video_count: competitor.videos.len(),
        best_video: best_video(&competitor.videos).map(|v| v.title.clone()),
    })
}

/// Rule-based suggestions from timing, best and worst videos and competitors
pub fn initial_recommendations(summary: &AnalysisSummary) -> Vec<String> {
    let mut suggestions = Vec::new();

    if let (Some(ref day), Some(hour)) = (&summary.best_day, summary.best_hour) {
        suggestions.push(format!("Publish on {day} at {hour}:00 for better engagement"));
    }
    if let Some(ref best) = summary.best_video {
        suggestions.push(format!("Create more videos like '{best}' (high performance)"));
    }
    if let Some(ref worst) = summary.worst_video {
        suggestions.push(format!(
            "Avoid topics/approaches similar to '{worst}' (low engagement)"
        ));
    }

    for competitor in &summary.competitors {
        if competitor.avg_views <= summary.avg_views {
            continue;
        }
        suggestions.push(match competitor.best_video {
            Some(ref best) => format!(
                "Analyze {}'s successful content strategies. Its best performing video is '{best}'.",
                competitor.title
            ),
            None => format!("Analyze {}'s successful content strategies.", competitor.title),
        });
    }

    suggestions
}

/// Aggregates used to prompt the strategist
pub fn summarize(
    channel_name: &str,
    videos: &[VideoRecord],
    competitors: &[Competitor],
    top_n: usize,
) -> AnalysisSummary {
    let mut summary = AnalysisSummary {
        channel_name: channel_name.to_string(),
        total_videos: videos.len(),
        avg_views: average_views(videos),
        avg_engagement_rate: average_engagement(videos),
        best_video: best_video(videos).map(|v| v.title.clone()),
        worst_video: worst_video(videos).map(|v| v.title.clone()),
        trending_topics: title_keywords(videos, TRENDING_KEYWORDS),
        top_videos: top_by_engagement(videos, top_n),
        avg_duration_secs: average_duration(videos),
        best_day: best_publish_day(videos).map(str::to_string),
        best_hour: best_publish_hour(videos),
        competitors: competitors.iter().filter_map(competitor_summary).collect(),
        initial_recommendations: Vec::new(),
    };
    summary.initial_recommendations = initial_recommendations(&summary);
    summary
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::pipeline::framework::CompetitorChannel;
    use chrono::TimeZone;

    fn video(title: &str, day: u32, views: u64, likes: u64, comments: u64) -> VideoRecord {
        VideoRecord {
            video_id: format!("v{day}"),
            title: title.to_string(),
            published_at: Some(Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap()),
            views,
            likes,
            comments,
            duration_secs: None,
        }
    }

    fn competitor(id: &str, videos: Vec<VideoRecord>) -> Competitor {
        Competitor {
            channel: CompetitorChannel {
                channel_id: id.to_string(),
                title: format!("{id} channel"),
                description: String::new(),
            },
            videos,
        }
    }

    #[test]
    fn test_engagement_rate_guards_zero_views() {
        assert_eq!(engagement_rate(&video("a", 1, 0, 3, 2)), 5.0);
        assert!((engagement_rate(&video("a", 1, 200, 6, 4)) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_top_by_engagement_descending() {
        let videos = vec![
            video("low", 1, 1000, 10, 0),
            video("high", 2, 100, 20, 0),
            video("mid", 3, 100, 5, 0),
        ];
        let top = top_by_engagement(&videos, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].title, "high");
        assert_eq!(top[1].title, "mid");
    }

    #[test]
    fn test_recent_engagement_is_chronological() {
        let videos = vec![
            video("newest", 9, 100, 1, 0),
            video("oldest", 1, 100, 1, 0),
            video("middle", 5, 100, 1, 0),
            video("second", 7, 100, 1, 0),
        ];
        let recent = recent_engagement(&videos, 3);
        let titles: Vec<_> = recent.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(titles, vec!["middle", "second", "newest"]);
    }

    #[test]
    fn test_recent_engagement_with_fewer_videos_than_requested() {
        let videos = vec![video("only", 1, 10, 1, 0)];
        assert_eq!(recent_engagement(&videos, 5).len(), 1);
    }

    #[test]
    fn test_average_engagement_empty() {
        assert_eq!(average_engagement(&[]), 0.0);
        assert_eq!(average_views(&[]), 0.0);
    }

    #[test]
    fn test_title_keywords_skip_stop_words() {
        let videos = vec![
            video("Rust for the Web", 1, 1, 0, 0),
            video("Async Rust in Depth", 2, 1, 0, 0),
            video("The Rust Book and Async", 3, 1, 0, 0),
        ];
        let keywords = title_keywords(&videos, 3);
        assert_eq!(keywords, vec!["rust", "async", "web"]);
    }

    #[test]
    fn test_best_video_composite_score() {
        let videos = vec![
            video("views only", 1, 10_000, 0, 0),
            video("all round", 2, 8_000, 500, 100),
        ];
        assert_eq!(best_video(&videos).unwrap().title, "all round");
        assert!(best_video(&[]).is_none());
    }

    #[test]
    fn test_summarize() {
        let videos = vec![video("Rust tips", 1, 100, 4, 1), video("Rust tricks", 2, 300, 3, 0)];
        let summary = summarize("Crab Channel", &videos, &[], 5);
        assert_eq!(summary.total_videos, 2);
        assert_eq!(summary.avg_views, 200.0);
        assert_eq!(summary.trending_topics[0], "rust");
        assert_eq!(summary.top_videos[0].title, "Rust tips");
        assert_eq!(summary.worst_video.as_deref(), Some("Rust tricks"));
        assert_eq!(summary.avg_duration_secs, 300.0);
        assert!(summary.competitors.is_empty());
    }

    #[test]
    fn test_worst_video_ignores_barely_watched_uploads() {
        let videos = vec![
            video("popular", 1, 10_000, 500, 0),
            video("steady", 2, 5_000, 50, 0),
            video("fine", 3, 4_000, 200, 0),
            video("unseen", 4, 10, 0, 0),
        ];
        // The 10th percentile sits above the unseen upload's views.
        assert_eq!(worst_video(&videos).unwrap().title, "steady");
    }

    #[test]
    fn test_worst_video_with_zero_quantile_considers_everything() {
        let videos = vec![
            video("silent", 1, 0, 0, 0),
            video("muted", 2, 0, 0, 0),
            video("loud", 3, 100, 10, 0),
        ];
        assert_eq!(worst_video(&videos).unwrap().title, "silent");
        assert!(worst_video(&[]).is_none());
    }

    #[test]
    fn test_parse_iso_duration() {
        assert_eq!(parse_iso_duration("PT1H2M3S"), Some(3723));
        assert_eq!(parse_iso_duration("PT15M"), Some(900));
        assert_eq!(parse_iso_duration("PT42S"), Some(42));
        assert_eq!(parse_iso_duration("P1D"), None);
        assert_eq!(parse_iso_duration("ten minutes"), None);
    }

    #[test]
    fn test_average_duration_defaults_unknown_lengths() {
        let mut short = video("short", 1, 1, 0, 0);
        short.duration_secs = Some(100);
        let unknown = video("unknown", 2, 1, 0, 0);
        assert_eq!(average_duration(&[short, unknown]), 200.0);
        assert_eq!(average_duration(&[]), 300.0);
    }

    #[test]
    fn test_best_publish_day_and_hour() {
        // 2025-01-06 is a Monday, 2025-01-07 a Tuesday
        let mut monday = video("monday", 6, 100, 1, 0);
        let mut tuesday = video("tuesday", 7, 100, 9, 0);
        let mut tuesday_late = video("tuesday late", 7, 100, 7, 0);
        monday.published_at = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).single();
        tuesday.published_at = Utc.with_ymd_and_hms(2025, 1, 7, 18, 0, 0).single();
        tuesday_late.published_at = Utc.with_ymd_and_hms(2025, 1, 7, 22, 0, 0).single();
        let videos = vec![monday, tuesday, tuesday_late];

        assert_eq!(best_publish_day(&videos), Some("Tuesday"));
        assert_eq!(best_publish_hour(&videos), Some(18));

        let mut undated = video("undated", 1, 100, 1, 0);
        undated.published_at = None;
        assert_eq!(best_publish_day(&[undated.clone()]), None);
        assert_eq!(best_publish_hour(&[undated]), None);
    }

    #[test]
    fn test_competitor_summary() {
        let summary = competitor_summary(&competitor(
            "K1",
            vec![video("big hit", 1, 9_000, 900, 0), video("miss", 2, 1_000, 10, 0)],
        ))
        .unwrap();
        assert_eq!(summary.title, "K1 channel");
        assert_eq!(summary.avg_views, 5_000.0);
        assert_eq!(summary.video_count, 2);
        assert_eq!(summary.best_video.as_deref(), Some("big hit"));

        assert!(competitor_summary(&competitor("K2", Vec::new())).is_none());
    }

    #[test]
    fn test_initial_recommendations() {
        let mut dated = video("Rust tips", 6, 100, 10, 0);
        dated.published_at = Utc.with_ymd_and_hms(2025, 1, 6, 15, 0, 0).single();
        let videos = vec![dated, video("Rust rant", 2, 200, 2, 0)];
        let competitors = vec![
            competitor("BIG", vec![video("viral", 1, 50_000, 10, 0)]),
            competitor("SMALL", vec![video("quiet", 1, 10, 1, 0)]),
        ];

        let summary = summarize("Crab", &videos, &competitors, 5);
        assert_eq!(
            summary.initial_recommendations,
            vec![
                "Publish on Monday at 15:00 for better engagement".to_string(),
                "Create more videos like 'Rust tips' (high performance)".to_string(),
                "Avoid topics/approaches similar to 'Rust rant' (low engagement)".to_string(),
                "Analyze BIG channel's successful content strategies. \
                 Its best performing video is 'viral'."
                    .to_string(),
            ]
        );
    }
}
