//! Shared progress record
//!
//! Wraps a `tokio::sync::watch` channel. Writers mutate the snapshot in
//! place under the channel's write lock; readers clone the whole value, so a
//! read never mixes fields from two different updates.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;

use super::types::ProgressSnapshot;

/// Handle to the process-wide progress snapshot
///
/// Cheap to clone; every clone points at the same record.
#[derive(Clone)]
pub struct ProgressStore {
    tx: Arc<watch::Sender<ProgressSnapshot>>,
}

impl ProgressStore {
    /// Create a store holding the initial `Idle` snapshot
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProgressSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    /// Owned copy of the latest snapshot
    pub fn read(&self) -> ProgressSnapshot {
        self.tx.borrow().clone()
    }

    /// Apply a mutation atomically and publish it
    ///
    /// Bumps `revision` and `updated_at`. Returns the new revision.
    pub fn update<F>(&self, mutate: F) -> u64
    where
        F: FnOnce(&mut ProgressSnapshot),
    {
        let mut revision = 0;
        self.tx.send_modify(|snapshot| {
            mutate(snapshot);
            snapshot.revision += 1;
            snapshot.updated_at = Utc::now();
            revision = snapshot.revision;
        });
        revision
    }

    /// Change notifications for in-process waiters
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.tx.subscribe()
    }

    /// Wait until the snapshot satisfies `predicate`, checking the current value first
    pub async fn wait_for<P>(&self, mut predicate: P) -> ProgressSnapshot
    where
        P: FnMut(&ProgressSnapshot) -> bool,
    {
        let mut rx = self.subscribe();
        let seen = rx
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .map(|snapshot| snapshot.clone());
        // The sender lives in `self`, so the channel cannot close here.
        seen.unwrap_or_else(|_| self.read())
    }
}

impl Default for ProgressStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.tx.borrow();
        f.debug_struct("ProgressStore")
            .field("state", &snapshot.state)
            .field("revision", &snapshot.revision)
            .finish()
    }
}
