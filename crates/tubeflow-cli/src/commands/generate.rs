//! `tubeflow generate` command implementation

use colored::Colorize;
use std::time::Duration;

use crate::api::{ApiClient, PollTarget};
use crate::commands::watch;
use crate::error::Result;

/// Render the video for 1-based `option` and follow it unless `no_wait`
pub async fn run(client: &ApiClient, option: u32, no_wait: bool, interval: Duration) -> Result<()> {
    let index = option.saturating_sub(1) as usize;
    println!("{} Requesting video for option {}...", "→".cyan(), option);

    let accepted = client.generate_selected(index).await?;
    println!("{} {}", "✓".green(), accepted.message);

    if no_wait {
        return Ok(());
    }

    watch::follow(client, PollTarget::Selective(index), interval).await
}
