//! `tubeflow start` command implementation

use colored::Colorize;
use std::time::Duration;

use crate::api::{ApiClient, PollTarget};
use crate::commands::watch;
use crate::error::{CliError, Result};

/// Start the main run and follow it unless `no_wait`
pub async fn run(
    client: &ApiClient,
    channel: Option<String>,
    no_wait: bool,
    interval: Duration,
) -> Result<()> {
    println!("{} Starting pipeline...", "→".cyan());

    if !client.health_check().await? {
        return Err(CliError::Unreachable(client.base_url().to_string()));
    }

    let accepted = client.start(channel.as_deref()).await?;
    println!("{} {}", "✓".green(), accepted.message);

    if no_wait {
        return Ok(());
    }

    watch::follow(client, PollTarget::MainRun, interval).await
}
