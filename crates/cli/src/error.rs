// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::sync::{AdapterError, QueueError};

/// All possible errors that can occur in the csync library.
///
/// Sync-cycle errors never escape the engine; they are turned into a failed
/// status with [`Error::status_reason`]. The rest surface to CLI commands.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not initialized: run 'csync init' first")]
    NotInitialized,

    #[error("already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("no network connection")]
    Offline,

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("download failed: {0}")]
    Download(String),

    #[error("storage error: {0}")]
    Storage(#[from] cs_core::Error),

    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("manual resolution required")]
    ManualResolutionRequired,

    #[error("sync failed: {0}")]
    SyncFailed(String),

    #[error("no conflict is waiting for a decision")]
    NoPendingConflict,

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Short reason published in a `failed(reason)` sync status.
    pub fn status_reason(&self) -> String {
        match self {
            Error::Offline => "offline".to_string(),
            Error::Upload(_) => "upload failed".to_string(),
            Error::Download(_) => "download failed".to_string(),
            Error::Storage(_) | Error::Queue(_) => "local storage failed".to_string(),
            Error::Adapter(e) => format!("cloud service error: {}", e),
            Error::NoPendingConflict => "no pending conflict".to_string(),
            other => other.to_string(),
        }
    }
}

/// A specialized Result type for csync operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
