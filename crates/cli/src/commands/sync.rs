// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot `sync` and `drain`.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use cs_core::{EntityType, KeyValueStore};

use crate::error::{Error, Result};
use crate::network::{NetworkObserver, NetworkStatus};
use crate::sync::{CloudService, DrainOutcome, SyncEngine, SyncOutcome, SyncStatus};

use super::{runtime, Context};

pub fn run(start: &Path, offline: bool, only: &[EntityType]) -> Result<()> {
    let ctx = Context::open(start)?;
    let rt = runtime()?;
    rt.block_on(async {
        let status = if offline {
            NetworkStatus::disconnected()
        } else {
            ctx.network_status().await?
        };
        let engine = ctx.engine(Arc::new(NetworkObserver::with_status(status)));
        let outcome = run_sync(&engine, &ctx.config.user_id, only).await?;
        let queued = engine.queue().len()?;
        println!("{}", describe_sync(&outcome, queued));
        check_sync(outcome)
    })
}

pub fn drain(start: &Path) -> Result<()> {
    let ctx = Context::open(start)?;
    let rt = runtime()?;
    rt.block_on(async {
        let status = ctx.network_status().await?;
        let engine = ctx.engine(Arc::new(NetworkObserver::with_status(status)));
        let outcome = engine.drain_offline_queue().await;
        let queued = engine.queue().len()?;
        println!("{}", describe_drain(&outcome, queued));
        check_drain(outcome)
    })
}

/// Snapshot local data now and run one cycle with it. A non-empty `only`
/// limits the cycle to those categories.
pub(crate) async fn run_sync<S: CloudService, K: KeyValueStore>(
    engine: &SyncEngine<S, K>,
    user_id: &str,
    only: &[EntityType],
) -> Result<SyncOutcome> {
    if only.is_empty() {
        let snapshot = engine.local().snapshot(user_id, Utc::now())?;
        return Ok(engine.sync(snapshot).await);
    }
    let snapshot = engine.local().snapshot_only(user_id, Utc::now(), only)?;
    Ok(engine.sync_categories(snapshot, only).await)
}

pub(crate) fn describe_sync(outcome: &SyncOutcome, queued: usize) -> String {
    match outcome {
        SyncOutcome::Busy => "Another sync is already running".to_string(),
        SyncOutcome::Finished(SyncStatus::Success) => "Sync complete".to_string(),
        SyncOutcome::Finished(SyncStatus::Failed(reason)) if reason == "offline" => {
            format!("Offline: snapshot queued ({} waiting)", plural(queued, "change"))
        }
        SyncOutcome::Finished(SyncStatus::Failed(reason))
            if reason == &Error::ManualResolutionRequired.status_reason() =>
        {
            "Conflict needs a decision: run 'csync resolve local' or 'csync resolve remote'"
                .to_string()
        }
        SyncOutcome::Finished(status) => format!("Sync {}", status),
    }
}

/// Queued-offline and waiting-for-decision are expected outcomes; any other
/// failure becomes an error.
fn check_sync(outcome: SyncOutcome) -> Result<()> {
    match outcome {
        SyncOutcome::Finished(SyncStatus::Failed(reason))
            if reason != "offline"
                && reason != Error::ManualResolutionRequired.status_reason() =>
        {
            Err(Error::SyncFailed(reason))
        }
        _ => Ok(()),
    }
}

pub(crate) fn describe_drain(outcome: &DrainOutcome, queued: usize) -> String {
    match outcome {
        DrainOutcome::Busy => "Another sync is already running".to_string(),
        DrainOutcome::Completed(report) if report.succeeded + report.failed == 0 => {
            "Offline queue is empty".to_string()
        }
        DrainOutcome::Completed(report) => format!(
            "Pushed {} ({} failed, {} remaining)",
            plural(report.succeeded, "change"),
            report.failed,
            report.remaining
        ),
        DrainOutcome::Failed(reason) if reason == "offline" => {
            format!("Offline: {} still queued", plural(queued, "change"))
        }
        DrainOutcome::Failed(reason) => format!("Drain failed: {}", reason),
    }
}

fn check_drain(outcome: DrainOutcome) -> Result<()> {
    match outcome {
        DrainOutcome::Completed(report) if report.failed > 0 => Err(Error::SyncFailed(format!(
            "{} queued changes failed",
            report.failed
        ))),
        DrainOutcome::Failed(reason) if reason != "offline" => Err(Error::SyncFailed(reason)),
        _ => Ok(()),
    }
}

pub(crate) fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", n, noun)
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
