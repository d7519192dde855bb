// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline-first snapshot sync.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐
//! │  Scheduler  │────►│   Engine    │────►│ CloudService │
//! │ (timer/net) │     │ (one cycle) │◄────│   (trait)    │
//! └─────────────┘     └─────────────┘     └──────────────┘
//!                        │       │
//!                        ▼       ▼
//!              ┌─────────────┐ ┌─────────────┐
//!              │    Queue    │ │  LocalData  │  (key-value store)
//!              │  (offline)  │ │ (categories)│
//!              └─────────────┘ └─────────────┘
//! ```
//!
//! # Features
//!
//! - Single-cycle guard shared by timer, reconnect drain and manual triggers
//! - Offline queue persisted in the key-value store, replayed in order
//! - Conflict policies: latest, local, cloud, manual (suspends for a decision)
//! - Ordered status and progress events
//! - Injectable cloud service trait for testing

mod adapter;
mod engine;
mod local;
mod queue;
mod scheduler;
mod settings;

pub use adapter::{
    check_connection, create_service, AdapterError, AdapterResult, Backend, CloudService,
    DirectoryService, MemoryService, ServiceFuture, TimeoutService, CONNECTION_TEST_PREFIX,
};
pub use engine::{
    DrainOutcome, SyncEngine, SyncEvent, SyncOutcome, SyncState, SyncStatus,
    PENDING_CONFLICT_KEY, PENDING_SCOPE_KEY, PROGRESS_APPLY, PROGRESS_DOWNLOAD, PROGRESS_RESOLVE, PROGRESS_UPLOAD,
    SYNC_STATE_KEY,
};
pub use local::{LocalData, LAST_SNAPSHOT_KEY};
pub use queue::{DrainPolicy, DrainReport, OfflineQueue, QueueError, QueueResult, QUEUE_KEY};
pub use scheduler::{SyncScheduler, TickOutcome};
pub use settings::{SyncConfig, DEFAULT_SYNC_INTERVAL_SECS, SYNC_CONFIG_KEY};

#[cfg(test)]
pub(crate) mod test_helpers;


#[cfg(test)]
mod engine_tests;
