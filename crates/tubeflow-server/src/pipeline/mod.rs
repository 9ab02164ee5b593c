//! Pipeline orchestration
//!
//! The engine behind `/start`, `/generate_selected` and `/status`.
//!
//! # Architecture
//!
//! - **framework**: progress store, stage contract, collaborator traits, shared types
//! - **main_run**: the six-stage channel analysis ([`PipelineRunner`])
//! - **selective**: the four-stage single-video job ([`SelectiveJobRunner`])
//! - **supervisor**: admission control and the single job slot ([`JobSupervisor`])
//! - **worker**: the task that executes accepted jobs
//! - **analysis** / **script**: pure helpers used by the stages
//!
//! Exactly one job runs at a time. Every state change goes through
//! [`ProgressStore::update`]; `/status` only ever reads.

pub mod analysis;
pub mod config;
pub mod error;
pub mod framework;
pub mod main_run;
pub mod script;
pub mod selective;
pub mod supervisor;
pub mod worker;

pub use config::PipelineConfig;
pub use error::{AdmissionError, StageError};
pub use framework::{Collaborators, PipelineState, ProgressSnapshot, ProgressStore};
pub use main_run::PipelineRunner;
pub use selective::{Selection, SelectiveJobRunner};
pub use supervisor::{Accepted, JobSupervisor};
pub use worker::{Job, JobOutcome};

/// Make a channel id safe to embed in a file name
pub(crate) fn file_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect::<String>()
        .to_lowercase();

    if cleaned.is_empty() {
        "channel".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_component() {
        assert_eq!(file_component("UC_abc-XYZ"), "uc_abc-xyz");
        assert_eq!(file_component("../../etc/passwd"), "etcpasswd");
        assert_eq!(file_component("  "), "channel");
    }
}
