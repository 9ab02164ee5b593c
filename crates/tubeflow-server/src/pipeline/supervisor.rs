//! Job admission
//!
//! The supervisor owns the single-permit exclusion guard. A start request
//! either takes the permit, writes its job's initial snapshot and hands the
//! job to the worker, or is refused without touching the progress store.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::config::PipelineConfig;
use super::error::AdmissionError;
use super::framework::{Collaborators, ProgressStore};
use super::main_run::PipelineRunner;
use super::selective::{Selection, SelectiveJobRunner};
use super::worker::{Job, JobOutcome, JobWorker, Submission};

const OUTCOME_CAPACITY: usize = 16;

/// Acknowledgement of an accepted start request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub message: String,
    pub target_index: Option<usize>,
}

struct Inner {
    store: ProgressStore,
    guard: Arc<Semaphore>,
    jobs: mpsc::Sender<Submission>,
    outcomes: broadcast::Sender<JobOutcome>,
    main: Arc<PipelineRunner>,
    selective: Arc<SelectiveJobRunner>,
    default_channel: Option<String>,
}

/// Cheaply cloneable handle shared by the HTTP handlers
#[derive(Clone)]
pub struct JobSupervisor {
    inner: Arc<Inner>,
}

impl JobSupervisor {
    /// Build the runners and spawn the job worker
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(
        store: ProgressStore,
        collaborators: Collaborators,
        config: Arc<PipelineConfig>,
    ) -> (Self, JoinHandle<()>) {
        let main = Arc::new(PipelineRunner::new(store.clone(), &collaborators, &config));
        let selective = Arc::new(SelectiveJobRunner::new(
            store.clone(),
            &collaborators,
            config.clone(),
        ));

        let (jobs_tx, jobs_rx) = mpsc::channel(1);
        let (outcomes, _) = broadcast::channel(OUTCOME_CAPACITY);

        let handle = JobWorker::new(
            jobs_rx,
            store.clone(),
            main.clone(),
            selective.clone(),
            outcomes.clone(),
        )
        .start();

        let supervisor = Self {
            inner: Arc::new(Inner {
                store,
                guard: Arc::new(Semaphore::new(1)),
                jobs: jobs_tx,
                outcomes,
                main,
                selective,
                default_channel: config.default_channel_id.clone(),
            }),
        };

        (supervisor, handle)
    }

    /// Accept a main run for `channel_id`, or the configured default channel
    pub fn start_main(&self, channel_id: Option<&str>) -> Result<Accepted, AdmissionError> {
        let channel_id = match channel_id {
            Some(id) => Some(id.trim()).filter(|id| !id.is_empty()).map(str::to_string),
            None => self.inner.default_channel.clone(),
        }
        .ok_or(AdmissionError::InvalidChannel)?;

        let permit = self.acquire()?;
        self.ensure_worker()?;

        self.inner.main.begin(&channel_id);
        info!(channel_id = %channel_id, "Main run accepted");
        self.submit(Job::Main { channel_id }, permit)?;

        Ok(Accepted {
            message: "Pipeline initiated".to_string(),
            target_index: None,
        })
    }

    /// Accept a selective job for recommendation `index`
    ///
    /// The index comes straight from the client; negative values are out of range.
    pub fn start_selective(&self, index: i64) -> Result<Accepted, AdmissionError> {
        let permit = self.acquire()?;
        let selection = Selection::from_snapshot(&self.inner.store.read(), index)?;
        self.ensure_worker()?;

        let index = selection.index;
        self.inner.selective.enter(&selection);
        info!(index, title = %selection.recommendation.target_title, "Selective job accepted");
        self.submit(Job::Selective(selection), permit)?;

        Ok(Accepted {
            message: format!("Generation for Option {} started", index + 1),
            target_index: Some(index),
        })
    }

    /// Outcomes of finished jobs, in completion order
    pub fn subscribe_outcomes(&self) -> broadcast::Receiver<JobOutcome> {
        self.inner.outcomes.subscribe()
    }

    /// Whether a job currently holds the permit
    pub fn is_busy(&self) -> bool {
        self.inner.guard.available_permits() == 0
    }

    pub fn store(&self) -> &ProgressStore {
        &self.inner.store
    }

    fn acquire(&self) -> Result<OwnedSemaphorePermit, AdmissionError> {
        self.inner.guard.clone().try_acquire_owned().map_err(|_| {
            debug!("Start request rejected: a job is active");
            AdmissionError::Busy
        })
    }

    fn ensure_worker(&self) -> Result<(), AdmissionError> {
        if self.inner.jobs.is_closed() {
            error!("Job worker is gone; refusing new jobs");
            return Err(AdmissionError::WorkerUnavailable);
        }
        Ok(())
    }

    fn submit(&self, job: Job, permit: OwnedSemaphorePermit) -> Result<(), AdmissionError> {
        let target_index = job.target_index();
        self.inner
            .jobs
            .try_send(Submission { job, permit })
            .map_err(|err| {
                // The initial snapshot is already written; close it out.
                error!(error = %err, "Failed to hand job to the worker");
                self.inner.store.update(|snapshot| {
                    snapshot.target_index = target_index;
                    snapshot.fail(
                        "Job could not be scheduled".to_string(),
                        AdmissionError::WorkerUnavailable.to_string(),
                    );
                });
                AdmissionError::WorkerUnavailable
            })
    }
}

impl std::fmt::Debug for JobSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSupervisor")
            .field("busy", &self.is_busy())
            .field("default_channel", &self.inner.default_channel)
            .finish()
    }
}
