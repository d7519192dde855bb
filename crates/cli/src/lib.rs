// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! csync - Offline-first snapshot sync with conflict resolution.
//!
//! This crate provides the sync layer behind the `csync` CLI. A user's
//! learning data (progress, study plans, chats, groups, posts) lives in a
//! local key-value store and is pushed to and pulled from a cloud service as
//! one snapshot per cycle.
//!
//! # Main Components
//!
//! - [`NetworkObserver`] - Current connectivity and change notifications
//! - [`OfflineQueue`] - Durable FIFO of changes made while offline
//! - [`SyncEngine`] - The upload/download/resolve/apply cycle
//! - [`SyncScheduler`] - Interval ticks and reconnect drains
//! - [`CloudService`] - The remote blob store seam
//! - [`Config`] - Project configuration in `.csync/config.toml`
//!
//! Conflict resolution itself lives in `cs_core`.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use csync::{MemoryService, NetworkObserver, SyncEngine};
//! use cs_core::MemoryStore;
//!
//! let engine = SyncEngine::new(
//!     MemoryService::new(),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(NetworkObserver::new()),
//! );
//! let snapshot = engine.local().snapshot("alice", chrono::Utc::now())?;
//! engine.sync(snapshot).await;
//! ```

mod cli;
mod commands;

pub mod config;
pub mod error;
pub mod events;
pub mod network;
pub mod sync;

pub use cli::{
    Cli, CloudCommand, Command, ConfigCommand, LocalCommand, OutputFormat, QueueCommand,
    ResolveSide,
};
pub use config::{find_work_dir, init_work_dir, Config};
pub use error::{Error, Result};
pub use events::EventBus;
pub use network::{ConnectionType, NetworkObserver, NetworkStatus};
pub use sync::{
    CloudService, DirectoryService, MemoryService, OfflineQueue, SyncConfig, SyncEngine,
    SyncScheduler, SyncState, SyncStatus,
};

use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber. `RUST_LOG` overrides `default_level`.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let start = match cli.directory {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    dispatch(&start, cli.command)
}

fn dispatch(start: &Path, command: Command) -> Result<()> {
    match command {
        Command::Init {
            user,
            backend,
            cloud_root,
        } => commands::init::run(start, user, backend, cloud_root),
        Command::Sync { offline, only } => commands::sync::run(start, offline, &only),
        Command::Drain => commands::sync::drain(start),
        Command::Status { output } => commands::status::run(start, output),
        Command::Queue(cmd) => commands::queue::run(start, cmd),
        Command::Config(cmd) => commands::config::run(start, cmd),
        Command::Cloud(cmd) => commands::cloud::run(start, cmd),
        Command::Resolve { side } => commands::resolve::run(start, side.into()),
        Command::Local(cmd) => commands::local::run(start, cmd),
        Command::Run => commands::run::run(start),
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "csync", &mut std::io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
