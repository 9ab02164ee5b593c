//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod generate;
pub mod start;
pub mod status;
pub mod watch;
