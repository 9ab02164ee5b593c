//! Tubeflow CLI Library
//!
//! Command-line client for a running Tubeflow server.
//!
//! # Overview
//!
//! - **Main run**: analyse a channel and get recommendations (`tubeflow start`)
//! - **Video generation**: render one recommendation (`tubeflow generate 1`)
//! - **Status**: print the current snapshot (`tubeflow status`)
//! - **Watching**: follow a job started elsewhere (`tubeflow watch`)
//!
//! Every start command polls `/status` until the job it started reaches
//! `Completed` or `Error`. Terminal snapshots left behind by other jobs are
//! ignored.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod commands;
pub mod error;
pub mod poll;
pub mod progress;

// Re-export commonly used types
pub use error::{CliError, Result};

use clap::{Parser, Subcommand};

/// Default seconds between two status polls
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;

/// Tubeflow - channel analysis and video generation pipeline client
#[derive(Parser, Debug)]
#[command(name = "tubeflow")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Server URL
    #[arg(
        long,
        env = "TUBEFLOW_SERVER_URL",
        default_value = "http://localhost:8000",
        global = true
    )]
    pub server_url: String,

    /// Seconds between status polls
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS, global = true)]
    pub interval: u64,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the main analysis run
    Start {
        /// Channel id (defaults to the server's CHANNEL_ID)
        #[arg(short, long)]
        channel: Option<String>,

        /// Return once the run is accepted
        #[arg(long)]
        no_wait: bool,
    },

    /// Generate the video for one recommendation
    Generate {
        /// Recommendation number as shown by `status` (1-based)
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        option: u32,

        /// Return once the job is accepted
        #[arg(long)]
        no_wait: bool,
    },

    /// Show the current pipeline snapshot
    Status {
        /// Print the raw JSON snapshot
        #[arg(long)]
        json: bool,
    },

    /// Follow a job that is already running
    Watch {
        /// Recommendation number of a video job; omit for the main run
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        option: Option<u32>,
    },
}
