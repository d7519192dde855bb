// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cs_core::KeyValueStore;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::sync::{OfflineQueue, SyncConfig, SyncState, PENDING_CONFLICT_KEY, SYNC_STATE_KEY};

use super::config::format_interval;
use super::Context;

/// Everything `csync status` reports.
#[derive(Debug, Serialize)]
pub(crate) struct StatusReport {
    pub user_id: String,
    #[serde(flatten)]
    pub state: SyncState,
    pub queued_changes: usize,
    pub pending_conflict: bool,
    pub preferences: SyncConfig,
}

pub fn run(start: &Path, output: OutputFormat) -> Result<()> {
    let ctx = Context::open(start)?;
    let report = collect(&ctx.store, &ctx.config.user_id)?;
    match output {
        OutputFormat::Text => println!("{}", format_report(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

/// Read the state as last persisted. A cycle running in another process
/// shows as `syncing`.
pub(crate) fn collect<K: KeyValueStore>(store: &Arc<K>, user_id: &str) -> Result<StatusReport> {
    let state: SyncState = store.get_json(SYNC_STATE_KEY)?.unwrap_or_default();
    let queued_changes = OfflineQueue::new(Arc::clone(store)).len()?;
    let pending_conflict = store.get(PENDING_CONFLICT_KEY)?.is_some();
    Ok(StatusReport {
        user_id: user_id.to_string(),
        state,
        queued_changes,
        pending_conflict,
        preferences: SyncConfig::load(&**store)?,
    })
}

pub(crate) fn format_report(report: &StatusReport) -> String {
    let prefs = &report.preferences;
    let mut lines = vec![
        format!("user: {}", report.user_id),
        format!("status: {}", report.state.status),
        format!("progress: {:.0}%", report.state.progress * 100.0),
        format!("last sync: {}", format_time(report.state.last_sync_time)),
        format!("queued changes: {}", report.queued_changes),
    ];
    if report.pending_conflict {
        lines.push("pending conflict: yes (run 'csync resolve local|remote')".to_string());
    }
    let auto = if prefs.auto_sync_enabled {
        format!("every {}", format_interval(prefs.sync_interval_secs))
    } else {
        "off".to_string()
    };
    let wifi = if prefs.wifi_only { ", wifi only" } else { "" };
    lines.push(format!("auto sync: {}{}", auto, wifi));
    lines.push(format!("conflict policy: {}", prefs.conflict_resolution));
    lines.join("\n")
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "never".to_string(),
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
