//! `tubeflow watch` command implementation
//!
//! Follows one job to its terminal snapshot. Also used by `start` and
//! `generate` once their job is accepted.

use colored::Colorize;
use std::time::Duration;

use crate::api::{ApiClient, PipelineStatus, PollTarget};
use crate::commands::status::print_snapshot;
use crate::error::{CliError, Result};
use crate::poll::Poller;
use crate::progress;

/// Watch the main run, or the video job for 1-based `option`
pub async fn run(client: &ApiClient, option: Option<u32>, interval: Duration) -> Result<()> {
    let target = match option {
        Some(option) => PollTarget::Selective(option.saturating_sub(1) as usize),
        None => PollTarget::MainRun,
    };

    follow(client, target, interval).await
}

/// Poll `target` to completion and print the result
///
/// Fails with [`CliError::JobFailed`] when the job ends in `Error`.
pub async fn follow(client: &ApiClient, target: PollTarget, interval: Duration) -> Result<()> {
    let pb = progress::create_job_progress(target);
    let poller = Poller::new(client, target, interval);

    let result = poller
        .run(|snapshot| progress::update_job_progress(&pb, target, snapshot))
        .await;
    pb.finish_and_clear();
    let snapshot = result?;

    println!();
    print_snapshot(client, &snapshot);

    if snapshot.status == PipelineStatus::Error {
        let cause = snapshot
            .last_error
            .clone()
            .unwrap_or_else(|| snapshot.details.clone());
        return Err(CliError::JobFailed(format!("The {target} failed: {cause}")));
    }

    println!("\n{} The {} finished", "✓".green().bold(), target);
    Ok(())
}
