//! Single-slot job worker
//!
//! Receives accepted jobs from the supervisor one at a time, runs them and
//! releases the exclusion permit on every exit path. A panicking stage is
//! caught here and turned into an `Error` snapshot.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, OwnedSemaphorePermit};
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::error::StageError;
use super::framework::{PipelineState, ProgressStore};
use super::main_run::PipelineRunner;
use super::selective::{Selection, SelectiveJobRunner};

/// An accepted unit of work
#[derive(Debug, Clone)]
pub enum Job {
    Main { channel_id: String },
    Selective(Selection),
}

impl Job {
    /// `None` for the main run, the recommendation index otherwise
    pub fn target_index(&self) -> Option<usize> {
        match self {
            Self::Main { .. } => None,
            Self::Selective(selection) => Some(selection.index),
        }
    }
}

/// A job together with the permit that admitted it
pub(crate) struct Submission {
    pub job: Job,
    pub permit: OwnedSemaphorePermit,
}

/// How a job ended, published after its permit is released
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub target_index: Option<usize>,
    pub state: PipelineState,
    pub error: Option<String>,
    pub video_url: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl JobOutcome {
    fn completed(target_index: Option<usize>, video_url: Option<String>) -> Self {
        Self {
            target_index,
            state: PipelineState::Completed,
            error: None,
            video_url,
            finished_at: Utc::now(),
        }
    }

    fn failed(target_index: Option<usize>, error: String) -> Self {
        Self {
            target_index,
            state: PipelineState::Error,
            error: Some(error),
            video_url: None,
            finished_at: Utc::now(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == PipelineState::Completed
    }
}

/// Worker executing jobs sequentially
pub(crate) struct JobWorker {
    jobs: mpsc::Receiver<Submission>,
    store: ProgressStore,
    main: Arc<PipelineRunner>,
    selective: Arc<SelectiveJobRunner>,
    outcomes: broadcast::Sender<JobOutcome>,
}

impl JobWorker {
    pub fn new(
        jobs: mpsc::Receiver<Submission>,
        store: ProgressStore,
        main: Arc<PipelineRunner>,
        selective: Arc<SelectiveJobRunner>,
        outcomes: broadcast::Sender<JobOutcome>,
    ) -> Self {
        Self {
            jobs,
            store,
            main,
            selective,
            outcomes,
        }
    }

    /// Spawn the worker loop; it ends when every sender is dropped
    pub fn start(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Job worker started");
            while let Some(submission) = self.jobs.recv().await {
                self.process(submission).await;
            }
            info!("Job worker stopped");
        })
    }

    async fn process(&self, submission: Submission) {
        let Submission { job, permit } = submission;
        let target_index = job.target_index();

        let outcome = match AssertUnwindSafe(self.dispatch(job)).catch_unwind().await {
            Ok(Ok(video_url)) => JobOutcome::completed(target_index, video_url),
            Ok(Err(err)) => JobOutcome::failed(target_index, err.to_string()),
            Err(payload) => {
                let err = StageError::Panicked(panic_message(payload.as_ref()));
                error!(?target_index, error = %err, "Job panicked");

                let cause = err.to_string();
                let detail = format!("Job aborted: {cause}");
                self.store.update(|snapshot| {
                    snapshot.target_index = target_index;
                    snapshot.fail(detail, cause.clone());
                });
                JobOutcome::failed(target_index, cause)
            }
        };

        drop(permit);

        // No subscriber is not an error.
        let _ = self.outcomes.send(outcome);
    }

    async fn dispatch(&self, job: Job) -> Result<Option<String>, StageError> {
        match job {
            Job::Main { channel_id } => self.main.execute(&channel_id).await.map(|()| None),
            Job::Selective(selection) => self.selective.execute(selection).await.map(Some),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(boxed.as_ref()), "owned boom");

        let boxed: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }

    #[test]
    fn test_job_target_index() {
        let job = Job::Main {
            channel_id: "C1".to_string(),
        };
        assert_eq!(job.target_index(), None);
    }

    #[test]
    fn test_outcome_constructors() {
        assert!(JobOutcome::completed(None, None).succeeded());
        let failed = JobOutcome::failed(Some(2), "boom".to_string());
        assert!(!failed.succeeded());
        assert_eq!(failed.target_index, Some(2));
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }
}
