// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The device's own copy of each data category.
//!
//! Every category is a separate JSON blob under its storage key, so one
//! category can be written while another fails.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use cs_core::{EntityType, KeyValueStore, SyncSnapshot};
use serde_json::Value;
use tracing::warn;

/// Key the last applied snapshot is stored under.
pub const LAST_SNAPSHOT_KEY: &str = "LastSnapshot";

/// Local data for all categories.
pub struct LocalData<K> {
    store: Arc<K>,
    write_lock: Mutex<()>,
}

impl<K: KeyValueStore> LocalData<K> {
    pub fn new(store: Arc<K>) -> Self {
        LocalData {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Stored value for `entity`, or the empty value for its shape.
    pub fn category(&self, entity: EntityType) -> cs_core::Result<Value> {
        let value = self.store.get_json::<Value>(entity.storage_key())?;
        Ok(value.unwrap_or_else(|| empty_value(entity)))
    }

    /// Replace the stored value for one category.
    pub fn set_category(&self, entity: EntityType, value: &Value) -> cs_core::Result<()> {
        let _guard = self.lock()?;
        self.store.set_json(entity.storage_key(), value)
    }

    /// Capture every category into a snapshot stamped with `time`.
    pub fn snapshot(&self, user_id: &str, time: DateTime<Utc>) -> cs_core::Result<SyncSnapshot> {
        let mut builder = SyncSnapshot::builder(user_id, time);
        for entity in EntityType::ALL {
            builder = builder.category(entity, self.category(entity)?);
        }
        Ok(builder.build())
    }

    /// Snapshot in which only `categories` come from local data.
    ///
    /// Every other category is copied from the last applied snapshot, so a
    /// partial sync never pushes unsynced edits of categories it was not
    /// asked for. Without a previous snapshot all categories are local.
    pub fn snapshot_only(
        &self,
        user_id: &str,
        time: DateTime<Utc>,
        categories: &[EntityType],
    ) -> cs_core::Result<SyncSnapshot> {
        let base = self.last_snapshot()?;
        let mut builder = SyncSnapshot::builder(user_id, time);
        for entity in EntityType::ALL {
            let value = match &base {
                Some(base) if !categories.contains(&entity) => base.category(entity),
                _ => self.category(entity)?,
            };
            builder = builder.category(entity, value);
        }
        Ok(builder.build())
    }

    /// Write each category of `snapshot` independently.
    ///
    /// A failing category does not stop the others. Returns the categories
    /// that failed. The snapshot itself is kept under [`LAST_SNAPSHOT_KEY`].
    pub fn apply(&self, snapshot: &SyncSnapshot) -> Vec<(EntityType, cs_core::Error)> {
        self.apply_only(snapshot, &EntityType::ALL)
    }

    /// [`LocalData::apply`] restricted to `categories`; the rest of the local
    /// data is left untouched.
    pub fn apply_only(
        &self,
        snapshot: &SyncSnapshot,
        categories: &[EntityType],
    ) -> Vec<(EntityType, cs_core::Error)> {
        let mut failures = Vec::new();
        let _guard = match self.lock() {
            Ok(guard) => guard,
            Err(e) => {
                failures.push((EntityType::UserProgress, e));
                return failures;
            }
        };

        for entity in EntityType::ALL.into_iter().filter(|e| categories.contains(e)) {
            if let Err(e) = self.store.set_json(entity.storage_key(), &snapshot.category(entity)) {
                warn!(category = %entity, error = %e, "failed to apply category");
                failures.push((entity, e));
            }
        }
        if let Err(e) = self.store.set_json(LAST_SNAPSHOT_KEY, snapshot) {
            warn!(error = %e, "failed to store last snapshot");
        }
        failures
    }

    /// The snapshot most recently applied, if any.
    pub fn last_snapshot(&self) -> cs_core::Result<Option<SyncSnapshot>> {
        self.store.get_json(LAST_SNAPSHOT_KEY)
    }

    fn lock(&self) -> cs_core::Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| cs_core::Error::StorageUnavailable("local data lock poisoned".to_string()))
    }
}

fn empty_value(entity: EntityType) -> Value {
    match entity {
        EntityType::UserProgress => Value::Null,
        _ => Value::Array(Vec::new()),
    }
}

