// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! cs-core: Shared library for the cloudsync engine
//!
//! This crate provides the data model that travels between devices and the
//! cloud, the conflict resolver, and the key-value storage the sync layer
//! persists into.

pub mod change;
pub mod error;
pub mod kv;
pub mod resolve;
pub mod snapshot;
pub mod sqlite;

pub use change::{ChangeType, DataChange};
pub use error::{Error, Result};
pub use kv::{KeyValueStore, MemoryStore};
pub use resolve::{resolve, ConflictPolicy, PendingConflict, Resolution, Side};
pub use snapshot::{EntityType, SnapshotBuilder, SyncSnapshot};
pub use sqlite::SqliteStore;
