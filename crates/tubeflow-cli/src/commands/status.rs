//! `tubeflow status` command implementation
//!
//! Prints the current snapshot once, either as a summary or as raw JSON.

use colored::{ColoredString, Colorize};
use tubeflow_common::types::format_engagement;

use crate::api::{ApiClient, PipelineStatus, StatusResponse};
use crate::error::Result;
use crate::progress::format_count;

/// Show the current pipeline snapshot
pub async fn run(client: &ApiClient, json: bool) -> Result<()> {
    let snapshot = client.status().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(client, &snapshot);
    }

    Ok(())
}

fn colored_status(status: PipelineStatus) -> ColoredString {
    match status {
        PipelineStatus::Idle => status.as_str().dimmed(),
        PipelineStatus::Running | PipelineStatus::GeneratingVideo => status.as_str().cyan(),
        PipelineStatus::Completed => status.as_str().green().bold(),
        PipelineStatus::Error => status.as_str().red().bold(),
    }
}

/// Print a human-readable summary of a snapshot
pub fn print_snapshot(client: &ApiClient, snapshot: &StatusResponse) {
    println!("{} {}", "Status:".bold(), colored_status(snapshot.status));
    println!("  {}", snapshot.details);

    if let Some(ref error) = snapshot.last_error {
        println!("  {} {}", "Error:".red(), error);
    }

    if let Some(ref stats) = snapshot.stats {
        println!("\n{} {}", "Channel:".bold(), stats.channel_name);
        println!(
            "  {} subscribers, {} videos, {} views, engagement {}",
            format_count(stats.subscribers),
            format_count(stats.videos),
            format_count(stats.views),
            stats.engagement
        );
    }

    if !snapshot.top_videos.is_empty() {
        println!("\n{}", "Top videos:".bold());
        for (i, video) in snapshot.top_videos.iter().enumerate() {
            println!(
                "  {}. {} ({})",
                i + 1,
                video.title,
                format_engagement(video.engagement_rate)
            );
        }
    }

    if !snapshot.recent_engagement.is_empty() {
        println!("\n{}", "Recent engagement (oldest first):".bold());
        for video in &snapshot.recent_engagement {
            println!(
                "  {} {}",
                format_engagement(video.engagement_rate).cyan(),
                video.title
            );
        }
    }

    if let Some(ref recommendations) = snapshot.recommendations {
        println!("\n{}", "Recommendations:".bold());
        for (i, rec) in recommendations.iter().enumerate() {
            println!(
                "  [{}] {} - {} ({})",
                i + 1,
                rec.target_title.bold(),
                rec.recommended_topic,
                rec.estimated_duration
            );
            let estimate = &rec.estimated_engagement;
            if !estimate.expected_views.is_empty() || !estimate.engagement_rate.is_empty() {
                println!(
                    "      expected views {}, engagement {}",
                    estimate.expected_views, estimate.engagement_rate
                );
            }
            if let Some(url) = snapshot.video_urls.get(&i) {
                println!("      {} {}", "video:".green(), client.artifact_url(url));
            }
        }
    }

    if let Some(ref url) = snapshot.video_url {
        println!("\n{} {}", "Video:".green().bold(), client.artifact_url(url));
    }
}
