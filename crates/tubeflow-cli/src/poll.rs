//! Status polling bound to one job
//!
//! A poller stops only on a terminal snapshot whose `target_index` matches
//! the job it follows (see [`PollTarget::is_finished`]). A `Completed` left
//! over from the previous job keeps it polling.

use std::time::Duration;
use tracing::{debug, warn};

use crate::api::{ApiClient, PollTarget, StatusResponse};
use crate::error::Result;

/// Consecutive failed polls tolerated before giving up
pub const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Polls `/status` on a fixed cadence for one job
pub struct Poller<'a> {
    client: &'a ApiClient,
    target: PollTarget,
    interval: Duration,
}

impl<'a> Poller<'a> {
    pub fn new(client: &'a ApiClient, target: PollTarget, interval: Duration) -> Self {
        Self {
            client,
            target,
            interval,
        }
    }

    pub fn target(&self) -> PollTarget {
        self.target
    }

    /// Poll until the target job reaches `Completed` or `Error`
    ///
    /// `on_snapshot` sees every snapshot, including ones from other jobs.
    /// Returns the terminal snapshot of the target job.
    pub async fn run<F>(&self, mut on_snapshot: F) -> Result<StatusResponse>
    where
        F: FnMut(&StatusResponse),
    {
        let mut failures = 0;

        loop {
            match self.client.status().await {
                Ok(snapshot) => {
                    failures = 0;
                    on_snapshot(&snapshot);

                    if self.target.is_finished(&snapshot) {
                        return Ok(snapshot);
                    }

                    debug!(
                        target = %self.target,
                        status = %snapshot.status,
                        target_index = ?snapshot.target_index,
                        "Job still in progress"
                    );
                }
                Err(err) => {
                    failures += 1;
                    if failures >= MAX_CONSECUTIVE_FAILURES {
                        return Err(err);
                    }
                    warn!(error = %err, failures, "Status poll failed, retrying");
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}
