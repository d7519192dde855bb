// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline queue for changes that could not be pushed.
//!
//! The whole queue is one JSON array stored under [`QUEUE_KEY`] in the
//! key-value store. Insertion order is replay order and survives restarts.
//! Entries leave the queue only after the cloud confirmed them.
//!
//! Every change to the array is a single [`KeyValueStore::update_json`], so a
//! one-shot command and a running scheduler sharing the store file cannot
//! lose each other's entries.

use std::future::Future;
use std::sync::Arc;

use cs_core::{DataChange, KeyValueStore};
use tracing::{debug, warn};

/// Key the queue is persisted under.
pub const QUEUE_KEY: &str = "OfflineDataChanges";

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The backing store failed or holds an unreadable queue.
    #[error("storage error: {0}")]
    Storage(#[from] cs_core::Error),
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// What to do when a queued change fails to apply during a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainPolicy {
    /// Keep the failed entry and try the next one.
    #[default]
    SkipFailed,
    /// Stop at the first failure; later entries are left untried.
    StopOnFailure,
}

/// Counts from one drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Entries still queued once the drain finished.
    pub remaining: usize,
}

/// Durable FIFO of [`DataChange`]s.
pub struct OfflineQueue<K> {
    store: Arc<K>,
}

impl<K: KeyValueStore> OfflineQueue<K> {
    pub fn new(store: Arc<K>) -> Self {
        OfflineQueue { store }
    }

    /// Append a change to the end of the queue.
    pub fn enqueue(&self, change: DataChange) -> QueueResult<()> {
        debug!(id = %change.id, entity = %change.entity_type, "enqueue change");
        self.store
            .update_json(QUEUE_KEY, |entries: &mut Vec<DataChange>| {
                entries.push(change)
            })?;
        Ok(())
    }

    /// Read all queued changes, oldest first, without removing them.
    pub fn peek_all(&self) -> QueueResult<Vec<DataChange>> {
        Ok(self
            .store
            .get_json::<Vec<DataChange>>(QUEUE_KEY)?
            .unwrap_or_default())
    }

    pub fn len(&self) -> QueueResult<usize> {
        Ok(self.peek_all()?.len())
    }

    pub fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Drop every queued change.
    pub fn clear(&self) -> QueueResult<()> {
        self.store
            .update_json(QUEUE_KEY, |entries: &mut Vec<DataChange>| entries.clear())?;
        Ok(())
    }

    /// Apply queued changes oldest to newest.
    ///
    /// `apply` returns whether the cloud accepted the change. `on_step` is
    /// called after each attempted entry with `(done, total)`. The queue is
    /// not locked while `apply` runs; changes enqueued meanwhile, by this
    /// process or another, are kept behind the entries that were already
    /// there.
    pub async fn drain<F, Fut, P>(
        &self,
        policy: DrainPolicy,
        mut apply: F,
        mut on_step: P,
    ) -> QueueResult<DrainReport>
    where
        F: FnMut(DataChange) -> Fut,
        Fut: Future<Output = bool>,
        P: FnMut(usize, usize),
    {
        let pending = self.peek_all()?;
        let total = pending.len();
        let mut report = DrainReport::default();
        let mut applied = Vec::new();

        for (index, change) in pending.into_iter().enumerate() {
            let id = change.id.clone();
            let ok = apply(change).await;
            if ok {
                report.succeeded += 1;
                applied.push(id);
            } else {
                report.failed += 1;
                warn!(id = %id, "queued change failed to apply");
            }
            on_step(index + 1, total);

            if !ok && policy == DrainPolicy::StopOnFailure {
                break;
            }
        }

        report.remaining = self.remove_ids(&applied)?;
        Ok(report)
    }

    /// Remove the given ids and return how many entries are left.
    fn remove_ids(&self, ids: &[String]) -> QueueResult<usize> {
        if ids.is_empty() {
            return self.len();
        }
        let remaining = self
            .store
            .update_json(QUEUE_KEY, |entries: &mut Vec<DataChange>| {
                entries.retain(|change| !ids.contains(&change.id));
                entries.len()
            })?;
        Ok(remaining)
    }
}
