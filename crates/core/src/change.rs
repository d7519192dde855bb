// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pending local mutations awaiting remote application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::snapshot::{EntityType, SyncSnapshot};

/// Process-wide sequence mixed into change ids.
static CHANGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Kind of mutation a change records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Create,
    Update,
    Delete,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Create => "create",
            ChangeType::Update => "update",
            ChangeType::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "create" => Ok(ChangeType::Create),
            "update" => Ok(ChangeType::Update),
            "delete" => Ok(ChangeType::Delete),
            _ => Err(Error::InvalidChangeType(s.to_string())),
        }
    }
}

/// One local mutation that has not yet been propagated remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataChange {
    /// Unique id, `chg-` followed by 16 hex chars.
    pub id: String,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    pub entity_id: String,
    pub entity_type: EntityType,
    pub timestamp: DateTime<Utc>,
    /// Serialized entity (JSON text). Empty for deletes.
    pub payload: String,
}

impl DataChange {
    /// Create a change with a freshly generated id.
    pub fn new(
        change_type: ChangeType,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        payload: String,
    ) -> Self {
        let entity_id = entity_id.into();
        DataChange {
            id: generate_change_id(entity_type, &entity_id, &timestamp),
            change_type,
            entity_id,
            entity_type,
            timestamp,
            payload,
        }
    }

    /// The queue record for a whole snapshot that could not be pushed.
    ///
    /// Snapshots are recorded as an update of the user's progress entity, so
    /// replaying the change writes to the snapshot location.
    pub fn snapshot_update(snapshot: &SyncSnapshot) -> Result<Self> {
        let payload = serde_json::to_string(snapshot)?;
        Ok(DataChange::new(
            ChangeType::Update,
            EntityType::UserProgress,
            snapshot.user_id(),
            Utc::now(),
            payload,
        ))
    }

    /// Cloud location this change writes to or deletes.
    pub fn remote_path(&self) -> String {
        format!("{}/{}", self.entity_type.remote_prefix(), self.entity_id)
    }
}

/// Generate a change id from the entity, timestamp and a process sequence.
/// Format: `chg-{hash}` where hash is the first 16 hex chars of SHA256.
pub fn generate_change_id(
    entity_type: EntityType,
    entity_id: &str,
    timestamp: &DateTime<Utc>,
) -> String {
    let seq = CHANGE_SEQ.fetch_add(1, Ordering::Relaxed);
    let input = format!(
        "{}{}{}{}",
        entity_type,
        entity_id,
        timestamp.to_rfc3339(),
        seq
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("chg-{}", hex::encode(&hash[..8]))
}

#[cfg(test)]
#[path = "change_tests.rs"]
mod tests;
