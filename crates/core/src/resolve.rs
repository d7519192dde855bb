// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Whole-snapshot conflict resolution.
//!
//! Resolution rules:
//! - Latest: greater `last_sync_time` wins, ties go to local
//! - Local: local always wins
//! - Cloud: remote always wins
//! - Manual: nothing is picked; both sides are handed back for a decision
//!
//! There is no field-level merge. A snapshot wins or loses as a unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::snapshot::SyncSnapshot;

/// Rule used to pick a winner between a local and a remote snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConflictPolicy {
    #[default]
    #[serde(rename = "latest")]
    LatestWins,
    #[serde(rename = "local")]
    LocalWins,
    #[serde(rename = "cloud")]
    CloudWins,
    #[serde(rename = "manual")]
    Manual,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::LatestWins => "latest",
            ConflictPolicy::LocalWins => "local",
            ConflictPolicy::CloudWins => "cloud",
            ConflictPolicy::Manual => "manual",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConflictPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "latest" | "latest-wins" => Ok(ConflictPolicy::LatestWins),
            "local" | "local-wins" => Ok(ConflictPolicy::LocalWins),
            "cloud" | "remote" | "cloud-wins" => Ok(ConflictPolicy::CloudWins),
            "manual" => Ok(ConflictPolicy::Manual),
            _ => Err(Error::InvalidPolicy(s.to_string())),
        }
    }
}

/// Which side of a conflict a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Local,
    Remote,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Local => write!(f, "local"),
            Side::Remote => write!(f, "remote"),
        }
    }
}

/// Both sides of a conflict that needs a human decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingConflict {
    pub local: SyncSnapshot,
    pub remote: SyncSnapshot,
    pub detected_at: DateTime<Utc>,
}

impl PendingConflict {
    /// Take the snapshot for the chosen side.
    pub fn choose(self, side: Side) -> SyncSnapshot {
        match side {
            Side::Local => self.local,
            Side::Remote => self.remote,
        }
    }
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A winner was picked automatically.
    Resolved {
        winner: Side,
        snapshot: SyncSnapshot,
    },
    /// The policy requires an external decision.
    NeedsDecision(PendingConflict),
}

impl Resolution {
    /// The resolved snapshot, if one was picked.
    pub fn into_snapshot(self) -> Option<SyncSnapshot> {
        match self {
            Resolution::Resolved { snapshot, .. } => Some(snapshot),
            Resolution::NeedsDecision(_) => None,
        }
    }
}

/// Resolve a local and a remote snapshot under `policy`.
///
/// Pure: no I/O and no clock reads other than stamping a manual conflict.
pub fn resolve(local: SyncSnapshot, remote: SyncSnapshot, policy: ConflictPolicy) -> Resolution {
    let pick = |winner: Side, local: SyncSnapshot, remote: SyncSnapshot| {
        let snapshot = match winner {
            Side::Local => local,
            Side::Remote => remote,
        };
        Resolution::Resolved { winner, snapshot }
    };

    match policy {
        ConflictPolicy::LatestWins => {
            let winner = if local.last_sync_time() >= remote.last_sync_time() {
                Side::Local
            } else {
                Side::Remote
            };
            pick(winner, local, remote)
        }
        ConflictPolicy::LocalWins => pick(Side::Local, local, remote),
        ConflictPolicy::CloudWins => pick(Side::Remote, local, remote),
        ConflictPolicy::Manual => Resolution::NeedsDecision(PendingConflict {
            local,
            remote,
            detected_at: Utc::now(),
        }),
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
