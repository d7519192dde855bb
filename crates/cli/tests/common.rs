// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Test helpers are shared across several test binaries; not every binary
// uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

pub fn csync() -> Command {
    cargo_bin_cmd!("csync")
}

/// A project for `alice` using the directory backend under `.csync/cloud`.
pub fn init_temp() -> TempDir {
    let temp = TempDir::new().unwrap();
    csync()
        .args(["init", "--user", "alice"])
        .current_dir(temp.path())
        .assert()
        .success();
    temp
}

/// Run `csync` with `args` inside `temp`.
pub fn run_in(temp: &TempDir, args: &[&str]) -> assert_cmd::assert::Assert {
    csync().args(args).current_dir(temp.path()).assert()
}

/// Stdout of a successful `csync` run inside `temp`.
pub fn stdout_of(temp: &TempDir, args: &[&str]) -> String {
    let output = run_in(temp, args).success().get_output().stdout.clone();
    String::from_utf8_lossy(&output).into_owned()
}

/// Set the connection type in `.csync/config.toml`.
pub fn set_connection_type(temp: &TempDir, connection_type: &str) {
    let path = temp.path().join(".csync/config.toml");
    let content = std::fs::read_to_string(&path).unwrap();
    let content = format!(
        "{}\n[network]\nconnection_type = \"{}\"\n",
        content
            .split("\n[network]")
            .next()
            .unwrap_or_default()
            .trim_end(),
        connection_type
    );
    std::fs::write(&path, content).unwrap();
}
