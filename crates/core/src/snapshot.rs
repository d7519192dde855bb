// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot types: one actor's full synchronizable state at one instant.
//!
//! Category payloads are carried as opaque JSON values. The sync layer never
//! looks inside them; it only moves whole categories between the local store
//! and the cloud.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Kind of application entity that can be synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Course progress for the user (one record per user).
    UserProgress,
    /// A study plan.
    StudyPlan,
    /// An AI chat session.
    ChatSession,
    /// A social study group.
    StudyGroup,
    /// A community post.
    StudyPost,
}

impl EntityType {
    /// Every entity type, in the order categories are applied.
    pub const ALL: [EntityType; 5] = [
        EntityType::UserProgress,
        EntityType::StudyPlan,
        EntityType::ChatSession,
        EntityType::StudyGroup,
        EntityType::StudyPost,
    ];

    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::UserProgress => "user_progress",
            EntityType::StudyPlan => "study_plan",
            EntityType::ChatSession => "chat_session",
            EntityType::StudyGroup => "study_group",
            EntityType::StudyPost => "study_post",
        }
    }

    /// Key of the local key-value entry holding this category.
    pub fn storage_key(&self) -> &'static str {
        match self {
            EntityType::UserProgress => "UserProgress",
            EntityType::StudyPlan => "StudyPlans",
            EntityType::ChatSession => "ChatSessions",
            EntityType::StudyGroup => "StudyGroups",
            EntityType::StudyPost => "CommunityPosts",
        }
    }

    /// First path segment for entities of this type on the cloud side.
    ///
    /// User progress is keyed by user, and a full snapshot is stored at the
    /// same location, so replaying a queued snapshot overwrites it in place.
    pub fn remote_prefix(&self) -> &'static str {
        match self {
            EntityType::UserProgress => "snapshots",
            EntityType::StudyPlan => "plans",
            EntityType::ChatSession => "chats",
            EntityType::StudyGroup => "groups",
            EntityType::StudyPost => "posts",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "user_progress" | "progress" => Ok(EntityType::UserProgress),
            "study_plan" | "plans" => Ok(EntityType::StudyPlan),
            "chat_session" | "chats" => Ok(EntityType::ChatSession),
            "study_group" | "groups" => Ok(EntityType::StudyGroup),
            "study_post" | "posts" => Ok(EntityType::StudyPost),
            _ => Err(Error::InvalidEntityType(s.to_string())),
        }
    }
}

/// Complete, immutable capture of one user's synchronizable state.
///
/// Built once per sync attempt through [`SyncSnapshot::builder`]; there are no
/// setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSnapshot {
    user_id: String,
    last_sync_time: DateTime<Utc>,
    #[serde(default)]
    user_progress: Value,
    #[serde(default)]
    study_plans: Vec<Value>,
    #[serde(default)]
    chat_sessions: Vec<Value>,
    #[serde(default)]
    study_groups: Vec<Value>,
    #[serde(default)]
    study_posts: Vec<Value>,
}

impl SyncSnapshot {
    /// Start building a snapshot for `user_id` taken at `last_sync_time`.
    pub fn builder(user_id: impl Into<String>, last_sync_time: DateTime<Utc>) -> SnapshotBuilder {
        SnapshotBuilder {
            inner: SyncSnapshot {
                user_id: user_id.into(),
                last_sync_time,
                user_progress: Value::Null,
                study_plans: Vec::new(),
                chat_sessions: Vec::new(),
                study_groups: Vec::new(),
                study_posts: Vec::new(),
            },
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn last_sync_time(&self) -> DateTime<Utc> {
        self.last_sync_time
    }

    pub fn user_progress(&self) -> &Value {
        &self.user_progress
    }

    pub fn study_plans(&self) -> &[Value] {
        &self.study_plans
    }

    pub fn chat_sessions(&self) -> &[Value] {
        &self.chat_sessions
    }

    pub fn study_groups(&self) -> &[Value] {
        &self.study_groups
    }

    pub fn study_posts(&self) -> &[Value] {
        &self.study_posts
    }

    /// The JSON value stored locally for one category.
    pub fn category(&self, entity: EntityType) -> Value {
        match entity {
            EntityType::UserProgress => self.user_progress.clone(),
            EntityType::StudyPlan => Value::Array(self.study_plans.clone()),
            EntityType::ChatSession => Value::Array(self.chat_sessions.clone()),
            EntityType::StudyGroup => Value::Array(self.study_groups.clone()),
            EntityType::StudyPost => Value::Array(self.study_posts.clone()),
        }
    }

    /// Cloud location of this user's snapshot.
    pub fn remote_path(&self) -> String {
        snapshot_path(&self.user_id)
    }

    /// Serialize to the JSON bytes uploaded to the cloud.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a snapshot downloaded from the cloud.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Cloud location of the snapshot for `user_id`.
pub fn snapshot_path(user_id: &str) -> String {
    format!("{}/{}", EntityType::UserProgress.remote_prefix(), user_id)
}

/// Builder for [`SyncSnapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    inner: SyncSnapshot,
}

impl SnapshotBuilder {
    pub fn user_progress(mut self, progress: Value) -> Self {
        self.inner.user_progress = progress;
        self
    }

    pub fn study_plans(mut self, plans: Vec<Value>) -> Self {
        self.inner.study_plans = plans;
        self
    }

    pub fn chat_sessions(mut self, sessions: Vec<Value>) -> Self {
        self.inner.chat_sessions = sessions;
        self
    }

    pub fn study_groups(mut self, groups: Vec<Value>) -> Self {
        self.inner.study_groups = groups;
        self
    }

    pub fn study_posts(mut self, posts: Vec<Value>) -> Self {
        self.inner.study_posts = posts;
        self
    }

    /// Set one category from its stored JSON value.
    ///
    /// List categories accept an array; any other shape is treated as empty.
    pub fn category(self, entity: EntityType, value: Value) -> Self {
        let list = |v: Value| match v {
            Value::Array(items) => items,
            _ => Vec::new(),
        };
        match entity {
            EntityType::UserProgress => self.user_progress(value),
            EntityType::StudyPlan => self.study_plans(list(value)),
            EntityType::ChatSession => self.chat_sessions(list(value)),
            EntityType::StudyGroup => self.study_groups(list(value)),
            EntityType::StudyPost => self.study_posts(list(value)),
        }
    }

    pub fn build(self) -> SyncSnapshot {
        self.inner
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
