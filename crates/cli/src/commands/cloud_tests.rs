// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::commands::init::init;
use crate::error::Error;
use crate::sync::Backend;
use tempfile::TempDir;

#[test]
fn test_succeeds_against_directory_backend() {
    let temp = TempDir::new().unwrap();
    let work_dir = init(temp.path(), "alice".to_string(), Backend::Directory, None).unwrap();

    run(temp.path(), CloudCommand::Test).unwrap();

    let leftovers = std::fs::read_dir(work_dir.join("cloud").join("test"))
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[test]
fn test_fails_when_backend_root_is_unusable() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();
    init(
        temp.path(),
        "alice".to_string(),
        Backend::Directory,
        Some(blocker),
    )
    .unwrap();

    assert!(matches!(
        run(temp.path(), CloudCommand::Test),
        Err(Error::Adapter(_))
    ));
}

#[test]
fn test_outside_project_is_not_initialized() {
    let temp = TempDir::new().unwrap();
    assert!(matches!(
        run(temp.path(), CloudCommand::Test),
        Err(Error::NotInitialized)
    ));
}
