//! Stage contract and the sequential stage driver
//!
//! A stage takes the runner's working state, does one unit of work and either
//! fills in more of that state or fails. [`StageSequence`] runs stages in
//! order and checkpoints the progress store after each one.

use async_trait::async_trait;
use std::time::Instant;
use tracing::{error, info};

use super::store::ProgressStore;
use super::types::ProgressSnapshot;
use crate::pipeline::error::StageError;

/// One step of a pipeline
#[async_trait]
pub trait Stage<S: Send>: Send + Sync {
    /// Short description shown in `"Step k/n: <label>"`
    fn label(&self) -> &str;

    /// Do the work, reading and extending `state`
    async fn run(&self, state: &mut S) -> Result<(), StageError>;
}

/// Working state that can copy what it has produced into the snapshot
pub trait StageState: Send {
    /// Publish newly available data; called after every successful stage
    fn publish(&self, _snapshot: &mut ProgressSnapshot) {}
}

/// A stage that failed inside a sequence
#[derive(Debug)]
pub struct StepFailure {
    pub step: u32,
    pub total: u32,
    pub label: String,
    pub error: StageError,
}

impl StepFailure {
    /// Human-readable failure detail, e.g. `"Pipeline failed at step 4/6: ..."`
    pub fn detail(&self, what: &str) -> String {
        format!(
            "{what} failed at step {}/{}: {}",
            self.step, self.total, self.error
        )
    }
}

/// Ordered list of stages run against one working state
pub struct StageSequence<S> {
    stages: Vec<Box<dyn Stage<S>>>,
}

impl<S: StageState> StageSequence<S> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage
    pub fn then(mut self, stage: impl Stage<S> + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn total(&self) -> u32 {
        self.stages.len() as u32
    }

    /// Label of the 1-based `step`
    pub fn label(&self, step: u32) -> &str {
        step.checked_sub(1)
            .and_then(|i| self.stages.get(i as usize))
            .map_or("", |stage| stage.label())
    }

    /// Run every stage in order
    ///
    /// The caller has already entered step 1. After each successful stage the
    /// state is published and the next step is entered in a single update, so
    /// pollers see the step counter move forward only. Stops at the first
    /// failure and leaves the terminal write to the caller.
    pub async fn execute(&self, store: &ProgressStore, state: &mut S) -> Result<(), StepFailure> {
        let total = self.total();

        for (i, stage) in self.stages.iter().enumerate() {
            let step = i as u32 + 1;
            let label = stage.label();
            let started = Instant::now();

            info!(step, total, stage = label, "Stage started");

            if let Err(err) = stage.run(state).await {
                error!(
                    step,
                    total,
                    stage = label,
                    duration_ms = started.elapsed().as_millis() as u64,
                    error = %err,
                    "Stage failed"
                );
                return Err(StepFailure {
                    step,
                    total,
                    label: label.to_string(),
                    error: err,
                });
            }

            info!(
                step,
                total,
                stage = label,
                duration_ms = started.elapsed().as_millis() as u64,
                "Stage completed"
            );

            let next = self.stages.get(i + 1).map(|s| s.label());
            store.update(|snapshot| {
                state.publish(snapshot);
                if let Some(next_label) = next {
                    snapshot.enter_step(step + 1, total, next_label);
                }
            });
        }

        Ok(())
    }
}

impl<S: StageState> Default for StageSequence<S> {
    fn default() -> Self {
        Self::new()
    }
}
