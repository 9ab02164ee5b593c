//! Progress bar utilities for CLI operations
//!
//! Provides the job progress bar and number formatting for the summary.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::api::{PollTarget, StatusResponse};

/// Create a percent bar for a running job
pub fn create_job_progress(target: PollTarget) -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos:>3}% {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-"),
    );
    pb.set_message(format!("Waiting for {target}..."));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Reflect a polled snapshot in the bar
///
/// Snapshots of other jobs only change the message.
pub fn update_job_progress(pb: &ProgressBar, target: PollTarget, snapshot: &StatusResponse) {
    if !target.owns(snapshot) {
        pb.set_message(format!("Waiting for {target}... ({})", snapshot.status));
        return;
    }

    if let Some(progress) = snapshot.progress {
        pb.set_position(u64::from(progress.percent));
    }
    pb.set_message(snapshot.details.clone());
}

/// Create a spinner for indeterminate operations
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Format a counter into a short human-readable string
pub fn format_count(count: u64) -> String {
    const UNITS: &[&str] = &["", "K", "M", "B"];
    let mut value = count as f64;
    let mut unit_idx = 0;

    while value >= 1000.0 && unit_idx < UNITS.len() - 1 {
        value /= 1000.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{}", count)
    } else {
        format!("{:.1}{}", value, UNITS[unit_idx])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tubeflow_common::types::{PipelineStatus, StepProgress};

    fn snapshot(target_index: Option<usize>, progress: Option<StepProgress>) -> StatusResponse {
        StatusResponse {
            status: PipelineStatus::Running,
            details: "Step 3/6: Fetching and ranking recent videos".to_string(),
            progress,
            target_index,
            stats: None,
            top_videos: Vec::new(),
            recent_engagement: Vec::new(),
            recommendations: None,
            video_url: None,
            video_urls: Default::default(),
            last_error: None,
            last_run: None,
        }
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1200), "1.2K");
        assert_eq!(format_count(3_450_000), "3.5M");
        assert_eq!(format_count(2_000_000_000), "2.0B");
    }

    #[test]
    fn test_update_owned_snapshot_moves_bar() {
        let pb = create_job_progress(PollTarget::MainRun);
        update_job_progress(
            &pb,
            PollTarget::MainRun,
            &snapshot(None, Some(StepProgress::new(3, 6))),
        );
        assert_eq!(pb.position(), 50);
        assert_eq!(pb.message(), "Step 3/6: Fetching and ranking recent videos");
        pb.finish_and_clear();
    }

    #[test]
    fn test_update_foreign_snapshot_keeps_position() {
        let pb = create_job_progress(PollTarget::Selective(0));
        update_job_progress(
            &pb,
            PollTarget::Selective(0),
            &snapshot(None, Some(StepProgress::new(3, 6))),
        );
        assert_eq!(pb.position(), 0);
        pb.finish_and_clear();
    }

    #[test]
    fn test_create_spinner() {
        let pb = create_spinner("Processing...");
        assert!(!pb.is_finished());
        pb.finish();
    }
}
