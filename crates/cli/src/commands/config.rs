// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use cs_core::{ConflictPolicy, KeyValueStore};

use crate::cli::{ConfigCommand, OutputFormat};
use crate::error::Result;
use crate::sync::SyncConfig;

use super::Context;

/// Execute a config subcommand.
pub fn run(start: &Path, cmd: ConfigCommand) -> Result<()> {
    let ctx = Context::open(start)?;
    match cmd {
        ConfigCommand::Show { output } => {
            let config = SyncConfig::load(&*ctx.store)?;
            print_config(&config, output)
        }
        ConfigCommand::Set {
            auto_sync,
            interval_minutes,
            wifi_only,
            policy,
        } => {
            let changes = ConfigChanges {
                auto_sync,
                interval_minutes,
                wifi_only,
                policy,
            };
            let config = run_set(&*ctx.store, changes)?;
            println!("Updated sync preferences");
            print_config(&config, OutputFormat::Text)
        }
    }
}

/// Preferences to change; `None` leaves a field as it is.
#[derive(Debug, Default)]
pub(crate) struct ConfigChanges {
    pub auto_sync: Option<bool>,
    pub interval_minutes: Option<u64>,
    pub wifi_only: Option<bool>,
    pub policy: Option<ConflictPolicy>,
}

/// Apply `changes` to the stored preferences and save them.
pub(crate) fn run_set<K: KeyValueStore>(store: &K, changes: ConfigChanges) -> Result<SyncConfig> {
    let mut config = SyncConfig::load(store)?;
    if let Some(enabled) = changes.auto_sync {
        config.auto_sync_enabled = enabled;
    }
    if let Some(minutes) = changes.interval_minutes {
        config.sync_interval_secs = minutes.saturating_mul(60);
    }
    if let Some(wifi_only) = changes.wifi_only {
        config.wifi_only = wifi_only;
    }
    if let Some(policy) = changes.policy {
        config.conflict_resolution = policy;
    }
    config.save(store)?;
    Ok(config)
}

pub(crate) fn format_config(config: &SyncConfig) -> String {
    format!(
        "auto sync: {}\ninterval: {}\nwifi only: {}\nconflict policy: {}",
        on_off(config.auto_sync_enabled),
        format_interval(config.sync_interval_secs),
        on_off(config.wifi_only),
        config.conflict_resolution,
    )
}

fn print_config(config: &SyncConfig, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Text => println!("{}", format_config(config)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// `300` -> `5m`, `90` -> `90s`.
pub(crate) fn format_interval(secs: u64) -> String {
    if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
