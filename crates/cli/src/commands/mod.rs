// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod cloud;
pub mod config;
pub mod init;
pub mod local;
pub mod queue;
pub mod resolve;
pub mod run;
pub mod status;
pub mod sync;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cs_core::SqliteStore;
use tokio::runtime::Runtime;

use crate::config::{find_work_dir, get_lock_path, get_store_path, Config};
use crate::error::{Error, Result};
use crate::network::{probe_once, ConnectionType, NetworkObserver, NetworkStatus};
use crate::sync::{create_service, CloudService, SyncEngine, TimeoutService};

/// Cloud service the CLI builds from `config.toml`.
pub type CliService = TimeoutService<Box<dyn CloudService>>;

/// Engine over the project's SQLite store.
pub type CliEngine = SyncEngine<CliService, SqliteStore>;

/// An opened project: its `.csync/` directory, configuration and store.
pub struct Context {
    pub work_dir: PathBuf,
    pub config: Config,
    pub store: Arc<SqliteStore>,
}

impl Context {
    /// Find the project containing `start` and open its store.
    pub fn open(start: &Path) -> Result<Self> {
        let work_dir = find_work_dir(start)?;
        let config = Config::load(&work_dir)?;
        let store = SqliteStore::open(&get_store_path(&work_dir))?;
        Ok(Context {
            work_dir,
            config,
            store: Arc::new(store),
        })
    }

    /// Build an engine that sees the network through `network`.
    pub fn engine(&self, network: Arc<NetworkObserver>) -> CliEngine {
        let service = create_service(&self.config.cloud, &self.work_dir);
        SyncEngine::new(service, Arc::clone(&self.store), network)
            .with_cycle_lock(get_lock_path(&self.work_dir))
    }

    /// Current connectivity: one probe if a probe address is configured,
    /// otherwise the configured connection type.
    pub async fn network_status(&self) -> Result<NetworkStatus> {
        if let Some(probe) = self.config.network.probe()? {
            return Ok(if probe_once(&probe.addr, probe.connect_timeout).await {
                NetworkStatus::connected(probe.connection_type)
            } else {
                NetworkStatus::disconnected()
            });
        }
        Ok(static_status(self.config.network.connection_type))
    }
}

/// Status for a project without a probe. `none` means offline.
fn static_status(connection_type: ConnectionType) -> NetworkStatus {
    match connection_type {
        ConnectionType::None => NetworkStatus::disconnected(),
        other => NetworkStatus::connected(other),
    }
}

/// Runtime for commands that talk to the cloud.
pub fn runtime() -> Result<Runtime> {
    Runtime::new().map_err(|e| Error::Io(std::io::Error::other(format!("tokio: {}", e))))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
