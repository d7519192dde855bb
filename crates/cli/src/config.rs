// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Project configuration management.
//!
//! Configuration is stored in `.csync/config.toml` and includes:
//! - `user_id`: The user whose data this project syncs
//! - `[cloud]`: Which cloud backend to use and its call timeout
//! - `[network]`: How connectivity is determined
//!
//! Sync preferences the user changes at runtime (interval, Wi-Fi only,
//! conflict policy) live in the store instead; see [`crate::sync::SyncConfig`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::network::{ConnectionType, ProbeConfig};
use crate::sync::Backend;

const WORK_DIR_NAME: &str = ".csync";
const CONFIG_FILE_NAME: &str = "config.toml";
const STORE_FILE_NAME: &str = "store.db";
const LOCK_FILE_NAME: &str = "sync.lock";
const GITIGNORE_FILE_NAME: &str = ".gitignore";

const PROBE_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Project configuration stored in `.csync/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// User whose snapshot is synced (letters, digits, `-` and `_`).
    pub user_id: String,
    #[serde(default)]
    pub cloud: CloudConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

/// Cloud backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudConfig {
    #[serde(default)]
    pub backend: Backend,
    /// Root directory for the `directory` backend, relative to `.csync/`
    /// unless absolute.
    #[serde(default = "default_cloud_root")]
    pub root: PathBuf,
    /// Upper bound for each cloud call (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        CloudConfig {
            backend: Backend::default(),
            root: default_cloud_root(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_cloud_root() -> PathBuf {
    PathBuf::from("cloud")
}

fn default_timeout_secs() -> u64 {
    30
}

/// Connectivity configuration.
///
/// Without `probe_addr` the device is considered connected with
/// `connection_type` for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_connection_type")]
    pub connection_type: ConnectionType,
    /// `host:port` checked with a TCP connect to decide reachability. The
    /// host may be a name; it is resolved on every probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_addr: Option<String>,
    /// Seconds between probes (default: 10).
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            connection_type: default_connection_type(),
            probe_addr: None,
            probe_interval_secs: default_probe_interval_secs(),
        }
    }
}

fn default_connection_type() -> ConnectionType {
    ConnectionType::Wifi
}

fn default_probe_interval_secs() -> u64 {
    10
}

impl NetworkConfig {
    /// Probe settings, if a probe address is configured.
    pub fn probe(&self) -> Result<Option<ProbeConfig>> {
        let Some(addr) = &self.probe_addr else {
            return Ok(None);
        };
        if !is_host_port(addr) {
            return Err(Error::InvalidValue {
                field: "network.probe_addr",
                reason: format!("'{}' is not a host:port address", addr),
            });
        }
        Ok(Some(ProbeConfig {
            addr: addr.clone(),
            connection_type: self.connection_type,
            interval: Duration::from_secs(self.probe_interval_secs.max(1)),
            connect_timeout: PROBE_CONNECT_TIMEOUT,
        }))
    }
}

/// `host:port` with a non-empty host and a numeric port. IPv6 hosts are
/// bracketed (`[::1]:443`).
fn is_host_port(addr: &str) -> bool {
    match addr.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty() && !host.contains(char::is_whitespace) && port.parse::<u16>().is_ok()
        }
        None => false,
    }
}

/// Returns true if `user_id` is usable as a cloud path segment.
pub fn validate_user_id(user_id: &str) -> bool {
    !user_id.is_empty()
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl Config {
    /// Creates a new config for `user_id` with default cloud and network
    /// settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if `user_id` is not a valid path segment.
    pub fn new(user_id: String) -> Result<Self> {
        if !validate_user_id(&user_id) {
            return Err(Error::InvalidValue {
                field: "user_id",
                reason: format!(
                    "'{}' must be non-empty and use only letters, digits, '-' or '_'",
                    user_id
                ),
            });
        }
        Ok(Config {
            user_id,
            cloud: CloudConfig::default(),
            network: NetworkConfig::default(),
        })
    }

    /// Loads configuration from the given `.csync/` directory.
    pub fn load(work_dir: &Path) -> Result<Self> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        let content = fs::read_to_string(&config_path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        if !validate_user_id(&config.user_id) {
            return Err(Error::Config(format!(
                "invalid user_id '{}' in config",
                config.user_id
            )));
        }
        Ok(config)
    }

    /// Saves configuration to the given `.csync/` directory.
    pub fn save(&self, work_dir: &Path) -> Result<()> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(&config_path, content)?;
        Ok(())
    }
}

/// Find the .csync directory by walking up from `start`.
pub fn find_work_dir(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let work_dir = current.join(WORK_DIR_NAME);
        if work_dir.is_dir() {
            return Ok(work_dir);
        }
        if !current.pop() {
            return Err(Error::NotInitialized);
        }
    }
}

/// Path of the key-value store inside a work directory.
pub fn get_store_path(work_dir: &Path) -> PathBuf {
    work_dir.join(STORE_FILE_NAME)
}

/// Path of the file held locked while a cycle runs.
pub fn get_lock_path(work_dir: &Path) -> PathBuf {
    work_dir.join(LOCK_FILE_NAME)
}

/// Initialize a new .csync directory at the given path.
pub fn init_work_dir(path: &Path, config: &Config) -> Result<PathBuf> {
    let work_dir = path.join(WORK_DIR_NAME);

    if work_dir.exists() {
        return Err(Error::AlreadyInitialized(work_dir.display().to_string()));
    }

    fs::create_dir_all(&work_dir)?;
    config.save(&work_dir)?;
    write_gitignore(&work_dir)?;

    Ok(work_dir)
}

/// Keep the store and the directory backend's blobs out of version control.
fn write_gitignore(work_dir: &Path) -> Result<()> {
    let content = format!(
        "# Local sync state\n{}\n{}-wal\n{}-shm\n{}\n\n# Directory cloud backend\ncloud/\n",
        STORE_FILE_NAME, STORE_FILE_NAME, STORE_FILE_NAME, LOCK_FILE_NAME
    );
    fs::write(work_dir.join(GITIGNORE_FILE_NAME), content)?;
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
