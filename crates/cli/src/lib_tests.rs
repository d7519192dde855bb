// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

//! Command-line parsing and routing that needs no project on disk.
//! Commands that open a project are covered by the tests/ binaries.

use super::*;
use clap::Parser;
use std::path::PathBuf;
use cs_core::{ConflictPolicy, EntityType};
use yare::parameterized;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("csync").chain(args.iter().copied())).unwrap()
}

#[test]
fn parse_init_defaults() {
    let cli = parse(&["init", "--user", "alice"]);
    match cli.command {
        Command::Init {
            user,
            backend,
            cloud_root,
        } => {
            assert_eq!(user, "alice");
            assert_eq!(backend, sync::Backend::Directory);
            assert!(cloud_root.is_none());
        }
        _ => panic!("expected init"),
    }
}

#[test]
fn parse_global_directory_after_subcommand() {
    let cli = parse(&["status", "-C", "/tmp/project"]);
    assert_eq!(cli.directory, Some(PathBuf::from("/tmp/project")));
}

#[test]
fn parse_config_set() {
    let cli = parse(&[
        "config",
        "set",
        "--auto-sync",
        "false",
        "--interval-minutes",
        "15",
        "--policy",
        "cloud",
    ]);
    match cli.command {
        Command::Config(ConfigCommand::Set {
            auto_sync,
            interval_minutes,
            wifi_only,
            policy,
        }) => {
            assert_eq!(auto_sync, Some(false));
            assert_eq!(interval_minutes, Some(15));
            assert_eq!(wifi_only, None);
            assert_eq!(policy, Some(ConflictPolicy::CloudWins));
        }
        _ => panic!("expected config set"),
    }
}

#[parameterized(
    zero_interval = { &["config", "set", "--interval-minutes", "0"] },
    bad_policy = { &["config", "set", "--policy", "newest"] },
    bad_category = { &["local", "show", "lessons"] },
    bad_side = { &["resolve", "both"] },
    bad_only = { &["sync", "--only", "lessons"] },
    missing_user = { &["init"] },
)]
fn parse_rejects(args: &[&str]) {
    let result = Cli::try_parse_from(std::iter::once("csync").chain(args.iter().copied()));
    assert!(result.is_err());
}

#[test]
fn parse_local_set_category_alias() {
    let cli = parse(&["local", "set", "plans", "[]"]);
    match cli.command {
        Command::Local(LocalCommand::Set { category, json }) => {
            assert_eq!(category, EntityType::StudyPlan);
            assert_eq!(json, "[]");
        }
        _ => panic!("expected local set"),
    }
}

#[test]
fn parse_sync_only_splits_on_commas() {
    let cli = parse(&["sync", "--only", "plans,chats", "--only", "posts"]);
    match cli.command {
        Command::Sync { offline, only } => {
            assert!(!offline);
            assert_eq!(
                only,
                vec![
                    EntityType::StudyPlan,
                    EntityType::ChatSession,
                    EntityType::StudyPost
                ]
            );
        }
        _ => panic!("expected sync"),
    }
}

#[test]
fn parse_cloud_test() {
    let cli = parse(&["cloud", "test"]);
    assert!(matches!(cli.command, Command::Cloud(CloudCommand::Test)));
}

#[test]
fn parse_resolve_side() {
    let cli = parse(&["resolve", "remote"]);
    assert!(matches!(
        cli.command,
        Command::Resolve {
            side: ResolveSide::Remote
        }
    ));
    assert_eq!(cs_core::Side::from(ResolveSide::Local), cs_core::Side::Local);
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn run_outside_project_is_not_initialized() {
    let temp = tempfile::TempDir::new().unwrap();
    let cli = Cli {
        directory: Some(temp.path().to_path_buf()),
        command: Command::Status {
            output: OutputFormat::Text,
        },
    };
    assert!(matches!(run(cli), Err(Error::NotInitialized)));
}
