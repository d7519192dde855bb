// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for cs-core operations.

use thiserror::Error;

/// All possible errors that can occur in cs-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error(
        "invalid conflict policy: '{0}'\n  hint: valid policies are: latest, local, cloud, manual"
    )]
    InvalidPolicy(String),

    #[error("invalid entity type: '{0}'\n  hint: valid types are: user_progress, study_plan, chat_session, study_group, study_post")]
    InvalidEntityType(String),

    #[error("invalid change type: '{0}'\n  hint: valid types are: create, update, delete")]
    InvalidChangeType(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data under key '{key}': {reason}")]
    CorruptedData { key: String, reason: String },
}

impl Error {
    /// Returns true if the backing store could not be reached at all, as
    /// opposed to holding data that failed to decode.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Error::StorageUnavailable(_) | Error::Database(_) | Error::Io(_)
        )
    }
}

/// A specialized Result type for cs-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
