// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};

use cs_core::SqliteStore;

use crate::config::{get_store_path, init_work_dir, Config};
use crate::error::Result;
use crate::sync::{Backend, SyncConfig};

pub fn run(
    target_path: &Path,
    user: String,
    backend: Backend,
    cloud_root: Option<PathBuf>,
) -> Result<()> {
    let work_dir = init(target_path, user, backend, cloud_root)?;
    let config = Config::load(&work_dir)?;

    println!("Initialized sync project at {}", work_dir.display());
    println!("User: {}", config.user_id);
    match config.cloud.backend {
        Backend::Directory => println!("Cloud: directory {}", config.cloud.root.display()),
        Backend::Memory => println!("Cloud: memory (nothing persists between runs)"),
    }
    Ok(())
}

/// Create `.csync/` with its config and an empty store holding default
/// sync preferences.
pub(crate) fn init(
    target_path: &Path,
    user: String,
    backend: Backend,
    cloud_root: Option<PathBuf>,
) -> Result<PathBuf> {
    let mut config = Config::new(user)?;
    config.cloud.backend = backend;
    if let Some(root) = cloud_root {
        config.cloud.root = root;
    }

    let work_dir = init_work_dir(target_path, &config)?;
    let store = SqliteStore::open(&get_store_path(&work_dir))?;
    SyncConfig::default().save(&store)?;
    Ok(work_dir)
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
