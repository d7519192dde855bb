// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::sync::Arc;

use cs_core::{DataChange, KeyValueStore};

use crate::cli::{OutputFormat, QueueCommand};
use crate::error::Result;
use crate::sync::OfflineQueue;

use super::sync::plural;
use super::Context;

/// Execute a queue subcommand.
pub fn run(start: &Path, cmd: QueueCommand) -> Result<()> {
    let ctx = Context::open(start)?;
    let queue = OfflineQueue::new(Arc::clone(&ctx.store));
    match cmd {
        QueueCommand::List { output } => {
            let changes = queue.peek_all()?;
            match output {
                OutputFormat::Text => {
                    if changes.is_empty() {
                        println!("Offline queue is empty");
                    }
                    for change in &changes {
                        println!("{}", format_change(change));
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&changes)?),
            }
            Ok(())
        }
        QueueCommand::Clear => {
            let removed = run_clear(&queue)?;
            println!("Removed {} from the offline queue", plural(removed, "change"));
            Ok(())
        }
    }
}

/// Empty the queue and return how many changes it held.
pub(crate) fn run_clear<K: KeyValueStore>(queue: &OfflineQueue<K>) -> Result<usize> {
    let count = queue.len()?;
    queue.clear()?;
    Ok(count)
}

/// `chg-… 2026-01-01T00:00:00Z update study_plan -> plans/p1`
pub(crate) fn format_change(change: &DataChange) -> String {
    format!(
        "{} {} {} {} -> {}",
        change.id,
        change.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
        change.change_type,
        change.entity_type,
        change.remote_path()
    )
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
