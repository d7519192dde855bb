// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing sync preferences, persisted in the key-value store.

use cs_core::{ConflictPolicy, KeyValueStore};
use serde::{Deserialize, Serialize};

/// Key the preferences are persisted under.
pub const SYNC_CONFIG_KEY: &str = "SyncConfig";

/// Default interval between scheduled syncs (five minutes).
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

/// Sync preferences. Re-read at the start of every scheduled cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub auto_sync_enabled: bool,
    pub sync_interval_secs: u64,
    pub wifi_only: bool,
    pub conflict_resolution: ConflictPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            auto_sync_enabled: true,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            wifi_only: false,
            conflict_resolution: ConflictPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Load preferences, falling back to defaults when none were saved.
    pub fn load<K: KeyValueStore>(store: &K) -> cs_core::Result<Self> {
        Ok(store.get_json(SYNC_CONFIG_KEY)?.unwrap_or_default())
    }

    pub fn save<K: KeyValueStore>(&self, store: &K) -> cs_core::Result<()> {
        store.set_json(SYNC_CONFIG_KEY, self)
    }

    /// The interval, never shorter than one second.
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sync_interval_secs.max(1))
    }
}
