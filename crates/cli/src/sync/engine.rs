// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The sync cycle.
//!
//! One cycle runs at a time. With a lock file configured that holds across
//! processes sharing the store too. A cycle walks
//! `syncing -> upload -> download -> resolve -> apply -> success`, and any
//! step error ends it as `failed(reason)`. Callers observe status and
//! progress, never the error itself.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use cs_core::{
    resolve, ChangeType, DataChange, EntityType, KeyValueStore, PendingConflict, Resolution,
    Side, SyncSnapshot,
};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::adapter::CloudService;
use super::local::LocalData;
use super::queue::{DrainPolicy, DrainReport, OfflineQueue};
use super::settings::SyncConfig;
use crate::error::{Error, Result};
use crate::events::EventBus;
use crate::network::NetworkObserver;

/// Key the engine state is persisted under.
pub const SYNC_STATE_KEY: &str = "SyncState";

/// Key an unresolved manual conflict is persisted under.
pub const PENDING_CONFLICT_KEY: &str = "PendingConflict";

/// Categories a pending conflict applies to, when it came from a partial
/// sync. Absent means every category.
pub const PENDING_SCOPE_KEY: &str = "PendingConflictScope";

/// Progress when the upload starts.
pub const PROGRESS_UPLOAD: f64 = 0.3;
/// Progress when the download starts.
pub const PROGRESS_DOWNLOAD: f64 = 0.6;
/// Progress when conflict resolution starts.
pub const PROGRESS_RESOLVE: f64 = 0.8;
/// Progress when local apply starts.
pub const PROGRESS_APPLY: f64 = 0.9;

/// Lifecycle of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Success,
    Failed(String),
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Idle => write!(f, "idle"),
            SyncStatus::Syncing => write!(f, "syncing"),
            SyncStatus::Success => write!(f, "success"),
            SyncStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Observable engine state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncState {
    pub status: SyncStatus,
    /// In `[0, 1]`.
    pub progress: f64,
    /// End of the last cycle that finished with success.
    pub last_sync_time: Option<DateTime<Utc>>,
}

/// Change notifications, delivered in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Status(SyncStatus),
    Progress(f64),
    /// One category could not be written locally during apply.
    CategoryFailed {
        category: EntityType,
        reason: String,
    },
}

/// Result of a [`SyncEngine::sync`] request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The cycle ran and ended with this status.
    Finished(SyncStatus),
    /// Another cycle was already running; nothing happened.
    Busy,
}

/// Result of a [`SyncEngine::drain_offline_queue`] request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    Completed(DrainReport),
    Busy,
    /// The drain could not run at all.
    Failed(String),
}

/// Releases the single-cycle flag, and the lock file if one was taken, when
/// dropped.
struct CycleGuard<'a> {
    flag: &'a AtomicBool,
    file: Option<File>,
}

impl<'a> CycleGuard<'a> {
    /// `Ok(None)` when a cycle is already running here or in another process
    /// holding `lock_path`.
    fn acquire(flag: &'a AtomicBool, lock_path: Option<&Path>) -> std::io::Result<Option<Self>> {
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(None);
        }
        let mut guard = CycleGuard { flag, file: None };
        if let Some(path) = lock_path {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)?;
            if let Err(e) = file.try_lock_exclusive() {
                if e.kind() == fs2::lock_contended_error().kind() {
                    return Ok(None);
                }
                return Err(e);
            }
            guard.file = Some(file);
        }
        Ok(Some(guard))
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            let _ = FileExt::unlock(file);
        }
        self.flag.store(false, Ordering::Release);
    }
}

/// Orchestrates sync cycles and offline-queue drains.
///
/// Shared behind an `Arc` by the scheduler and manual triggers.
pub struct SyncEngine<S, K> {
    service: S,
    store: Arc<K>,
    network: Arc<NetworkObserver>,
    queue: OfflineQueue<K>,
    local: LocalData<K>,
    state: Mutex<SyncState>,
    events: EventBus<SyncEvent>,
    in_progress: AtomicBool,
    cycle_lock: Option<PathBuf>,
    drain_policy: DrainPolicy,
}

impl<S: CloudService, K: KeyValueStore> SyncEngine<S, K> {
    /// Create an engine. The last persisted state is restored, except that an
    /// interrupted `syncing` status becomes `idle`.
    pub fn new(service: S, store: Arc<K>, network: Arc<NetworkObserver>) -> Self {
        let mut state = match store.get_json::<SyncState>(SYNC_STATE_KEY) {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable sync state");
                SyncState::default()
            }
        };
        if state.status == SyncStatus::Syncing {
            state.status = SyncStatus::Idle;
        }

        SyncEngine {
            service,
            queue: OfflineQueue::new(Arc::clone(&store)),
            local: LocalData::new(Arc::clone(&store)),
            store,
            network,
            state: Mutex::new(state),
            events: EventBus::new(),
            in_progress: AtomicBool::new(false),
            cycle_lock: None,
            drain_policy: DrainPolicy::default(),
        }
    }

    pub fn with_drain_policy(mut self, policy: DrainPolicy) -> Self {
        self.drain_policy = policy;
        self
    }

    /// Hold an exclusive lock on `path` for every cycle, drain and
    /// resolution, so engines in other processes report busy meanwhile.
    pub fn with_cycle_lock(mut self, path: impl Into<PathBuf>) -> Self {
        self.cycle_lock = Some(path.into());
        self
    }

    pub fn state(&self) -> SyncState {
        self.lock_state().clone()
    }

    pub fn is_syncing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Receive every state change made after this call.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn queue(&self) -> &OfflineQueue<K> {
        &self.queue
    }

    pub fn local(&self) -> &LocalData<K> {
        &self.local
    }

    pub fn store(&self) -> &Arc<K> {
        &self.store
    }

    pub fn network(&self) -> &Arc<NetworkObserver> {
        &self.network
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// The conflict waiting for [`SyncEngine::resolve_pending`], if any.
    pub fn pending_conflict(&self) -> Result<Option<PendingConflict>> {
        Ok(self.store.get_json(PENDING_CONFLICT_KEY)?)
    }

    fn begin(&self) -> Result<Option<CycleGuard<'_>>> {
        Ok(CycleGuard::acquire(
            &self.in_progress,
            self.cycle_lock.as_deref(),
        )?)
    }

    /// Run one full cycle for `snapshot`.
    pub async fn sync(&self, snapshot: SyncSnapshot) -> SyncOutcome {
        self.sync_categories(snapshot, &EntityType::ALL).await
    }

    /// Run one cycle that only writes `categories` back to local data.
    ///
    /// The whole snapshot is still uploaded and resolved; build it with
    /// [`LocalData::snapshot_only`] so the other categories carry what the
    /// cloud already has.
    pub async fn sync_categories(
        &self,
        snapshot: SyncSnapshot,
        categories: &[EntityType],
    ) -> SyncOutcome {
        let _guard = match self.begin() {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                debug!("sync requested while another cycle is running");
                return SyncOutcome::Busy;
            }
            Err(e) => {
                error!(error = %e, "cannot take the sync lock");
                let status = SyncStatus::Failed(e.status_reason());
                self.finish(status.clone());
                return SyncOutcome::Finished(status);
            }
        };

        info!(
            user = snapshot.user_id(),
            categories = categories.len(),
            "sync started"
        );
        self.set_status(SyncStatus::Syncing);
        self.set_progress(0.0);

        let status = match self.run_cycle(snapshot, categories).await {
            Ok(()) => SyncStatus::Success,
            Err(e) => {
                warn!(error = %e, "sync failed");
                SyncStatus::Failed(e.status_reason())
            }
        };
        self.finish(status.clone());
        SyncOutcome::Finished(status)
    }

    async fn run_cycle(&self, snapshot: SyncSnapshot, categories: &[EntityType]) -> Result<()> {
        if !self.network.is_connected() {
            self.queue.enqueue(DataChange::snapshot_update(&snapshot)?)?;
            info!("offline, snapshot queued");
            return Err(Error::Offline);
        }

        let config = SyncConfig::load(&*self.store)?;
        let path = snapshot.remote_path();

        self.set_progress(PROGRESS_UPLOAD);
        self.service
            .upload(&path, snapshot.to_bytes()?)
            .await
            .map_err(|e| Error::Upload(e.to_string()))?;

        self.set_progress(PROGRESS_DOWNLOAD);
        let remote = self
            .service
            .download(&path)
            .await
            .map_err(|e| Error::Download(e.to_string()))?
            .ok_or_else(|| Error::Download(format!("nothing stored at {}", path)))?;
        let remote =
            SyncSnapshot::from_bytes(&remote).map_err(|e| Error::Download(e.to_string()))?;

        self.set_progress(PROGRESS_RESOLVE);
        let resolved = match resolve(snapshot, remote, config.conflict_resolution) {
            Resolution::Resolved { winner, snapshot } => {
                debug!(%winner, policy = %config.conflict_resolution, "conflict resolved");
                snapshot
            }
            Resolution::NeedsDecision(conflict) => {
                self.store.set_json(PENDING_CONFLICT_KEY, &conflict)?;
                if categories.len() < EntityType::ALL.len() {
                    self.store.set_json(PENDING_SCOPE_KEY, &categories.to_vec())?;
                } else {
                    self.store.remove(PENDING_SCOPE_KEY)?;
                }
                info!("conflict needs a manual decision");
                return Err(Error::ManualResolutionRequired);
            }
        };

        self.set_progress(PROGRESS_APPLY);
        self.apply(&resolved, categories);
        Ok(())
    }

    /// Finish a suspended manual conflict by taking `side`.
    ///
    /// Taking the local side pushes it to the cloud again before applying.
    /// A conflict from a partial sync only writes the categories that sync
    /// was asked for.
    pub async fn resolve_pending(&self, side: Side) -> Result<SyncOutcome> {
        let Some(_guard) = self.begin()? else {
            return Ok(SyncOutcome::Busy);
        };
        let conflict = self.pending_conflict()?.ok_or(Error::NoPendingConflict)?;

        info!(%side, "resolving pending conflict");
        self.set_status(SyncStatus::Syncing);
        self.set_progress(PROGRESS_RESOLVE);

        let status = match self.finish_conflict(conflict, side).await {
            Ok(()) => SyncStatus::Success,
            Err(e) => {
                warn!(error = %e, "conflict resolution failed");
                SyncStatus::Failed(e.status_reason())
            }
        };
        self.finish(status.clone());
        Ok(SyncOutcome::Finished(status))
    }

    async fn finish_conflict(&self, conflict: PendingConflict, side: Side) -> Result<()> {
        let chosen = conflict.choose(side);
        if side == Side::Local {
            if !self.network.is_connected() {
                return Err(Error::Offline);
            }
            self.service
                .upload(&chosen.remote_path(), chosen.to_bytes()?)
                .await
                .map_err(|e| Error::Upload(e.to_string()))?;
        }

        let scope: Vec<EntityType> = self
            .store
            .get_json(PENDING_SCOPE_KEY)?
            .unwrap_or_else(|| EntityType::ALL.to_vec());

        self.set_progress(PROGRESS_APPLY);
        self.apply(&chosen, &scope);
        self.store.remove(PENDING_CONFLICT_KEY)?;
        self.store.remove(PENDING_SCOPE_KEY)?;
        Ok(())
    }

    fn apply(&self, snapshot: &SyncSnapshot, categories: &[EntityType]) {
        for (category, e) in self.local.apply_only(snapshot, categories) {
            self.events.publish(SyncEvent::CategoryFailed {
                category,
                reason: e.to_string(),
            });
        }
    }

    /// Replay queued changes against the cloud, oldest first.
    ///
    /// An empty queue returns at once without touching the status.
    pub async fn drain_offline_queue(&self) -> DrainOutcome {
        let _guard = match self.begin() {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                debug!("drain requested while another cycle is running");
                return DrainOutcome::Busy;
            }
            Err(e) => {
                error!(error = %e, "cannot take the sync lock");
                return DrainOutcome::Failed(e.status_reason());
            }
        };

        match self.queue.is_empty() {
            Ok(true) => return DrainOutcome::Completed(DrainReport::default()),
            Ok(false) => {}
            Err(e) => {
                error!(error = %e, "cannot read offline queue");
                return DrainOutcome::Failed(Error::from(e).status_reason());
            }
        }
        if !self.network.is_connected() {
            return DrainOutcome::Failed(Error::Offline.status_reason());
        }

        info!("draining offline queue");
        self.set_status(SyncStatus::Syncing);
        self.set_progress(0.0);

        let service = &self.service;
        let result = self
            .queue
            .drain(
                self.drain_policy,
                |change| apply_change(service, change),
                |done, total| self.set_progress(done as f64 / total as f64),
            )
            .await;

        match result {
            Ok(report) => {
                info!(
                    succeeded = report.succeeded,
                    failed = report.failed,
                    remaining = report.remaining,
                    "offline queue drained"
                );
                let status = if report.failed == 0 {
                    SyncStatus::Success
                } else {
                    SyncStatus::Failed(format!("{} queued changes failed", report.failed))
                };
                self.finish(status);
                DrainOutcome::Completed(report)
            }
            Err(e) => {
                let reason = Error::from(e).status_reason();
                self.finish(SyncStatus::Failed(reason.clone()));
                DrainOutcome::Failed(reason)
            }
        }
    }

    /// Back to `idle` with zero progress.
    pub fn reset_status(&self) {
        self.set_status(SyncStatus::Idle);
        self.set_progress(0.0);
        self.persist();
    }

    fn finish(&self, status: SyncStatus) {
        if status == SyncStatus::Success {
            self.set_progress(1.0);
            self.lock_state().last_sync_time = Some(Utc::now());
        }
        info!(%status, "cycle finished");
        self.set_status(status);
        self.persist();
    }

    fn set_status(&self, status: SyncStatus) {
        self.lock_state().status = status.clone();
        self.events.publish(SyncEvent::Status(status));
    }

    fn set_progress(&self, progress: f64) {
        let progress = progress.clamp(0.0, 1.0);
        self.lock_state().progress = progress;
        self.events.publish(SyncEvent::Progress(progress));
    }

    fn persist(&self) {
        let state = self.state();
        if let Err(e) = self.store.set_json(SYNC_STATE_KEY, &state) {
            warn!(error = %e, "failed to persist sync state");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Push one queued change to the cloud.
async fn apply_change<S: CloudService>(service: &S, change: DataChange) -> bool {
    let path = change.remote_path();
    let result = match change.change_type {
        ChangeType::Create | ChangeType::Update => {
            service.upload(&path, change.payload.into_bytes()).await
        }
        ChangeType::Delete => service.delete(&path).await,
    };
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(id = %change.id, path = %path, error = %e, "queued change rejected");
            false
        }
    }
}
