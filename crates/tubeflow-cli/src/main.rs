//! Tubeflow CLI - Main entry point

use clap::Parser;
use colored::Colorize;
use std::process;
use std::time::Duration;
use tracing::error;
use tubeflow_cli::api::ApiClient;
use tubeflow_cli::{Cli, Commands};
use tubeflow_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Verbose mode logs debug to the console; otherwise warnings only
    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Warn
        })
        .output(LogOutput::Console)
        .log_file_prefix("tubeflow-cli")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The CLI works without logging
    let _log_guard = init_logging(&log_config).ok();

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> tubeflow_cli::Result<()> {
    let client = ApiClient::new(cli.server_url.clone())?;
    let interval = Duration::from_secs(cli.interval);

    match &cli.command {
        Commands::Start { channel, no_wait } => {
            tubeflow_cli::commands::start::run(&client, channel.clone(), *no_wait, interval).await
        }

        Commands::Generate { option, no_wait } => {
            tubeflow_cli::commands::generate::run(&client, *option, *no_wait, interval).await
        }

        Commands::Status { json } => tubeflow_cli::commands::status::run(&client, *json).await,

        Commands::Watch { option } => {
            tubeflow_cli::commands::watch::run(&client, *option, interval).await
        }
    }
}
