//! Pipeline commands

pub mod start_main;
pub mod start_selective;

pub use start_main::StartMainCommand;
pub use start_selective::StartSelectiveCommand;
