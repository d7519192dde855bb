// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use cs_core::{ConflictPolicy, EntityType, Side};

use crate::sync::Backend;

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

// Custom help template that groups commands into sections
const HELP_TEMPLATE: &str = "{about-with-newline}
{usage-heading} {usage}

{before-help}Options:
{options}{after-help}";

const COMMANDS_HELP: &str = "\
Sync:
  sync        Sync local data with the cloud now
  drain       Push queued offline changes
  status      Show sync status
  resolve     Settle a conflict waiting for a decision
  run         Keep syncing on a timer and on reconnect

Data:
  local       Show or edit local data
  queue       Inspect the offline queue

Setup & Configuration:
  init        Initialize a sync project
  config      Show or change sync preferences
  cloud       Check the configured cloud backend
  completion  Generate shell completions";

const QUICKSTART_HELP: &str = "\
Get started:
  csync init --user alice             Initialize project
  csync local set study_plan '[]'     Edit a local category
  csync sync                          Sync once
  csync run                           Sync every interval until Ctrl-C";

#[derive(Parser)]
#[command(name = "csync")]
#[command(about = "Offline-first snapshot sync with conflict resolution")]
#[command(help_template = HELP_TEMPLATE)]
#[command(before_help = COMMANDS_HELP)]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', long = "directory", global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a sync project in the current directory
    #[command(after_help = "Examples:\n  \
        csync init --user alice                     Directory backend under .csync/cloud\n  \
        csync init --user alice --cloud-root /mnt/c Directory backend elsewhere\n  \
        csync init --user alice --backend memory    In-process backend (testing)")]
    Init {
        /// User whose data is synced
        #[arg(long, short)]
        user: String,

        /// Cloud backend
        #[arg(long, value_enum, default_value = "directory")]
        backend: Backend,

        /// Root directory for the directory backend
        #[arg(long, value_name = "DIR")]
        cloud_root: Option<PathBuf>,
    },

    /// Sync local data with the cloud now
    #[command(after_help = "Examples:\n  \
        csync sync                          Sync every category\n  \
        csync sync --only study_plan        Sync study plans only\n  \
        csync sync --only groups,posts      Sync social data only\n  \
        csync sync --offline                Queue the snapshot for later")]
    Sync {
        /// Treat the network as unavailable (the snapshot is queued)
        #[arg(long)]
        offline: bool,

        /// Only write these categories back locally (comma-separated)
        #[arg(long, value_name = "CATEGORY", value_delimiter = ',', value_parser = parse_entity)]
        only: Vec<EntityType>,
    },

    /// Push queued offline changes to the cloud
    Drain,

    /// Show sync status, progress and queue size
    Status {
        #[arg(long, short, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Inspect the offline queue
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Show or change sync preferences
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Check the configured cloud backend
    #[command(subcommand)]
    Cloud(CloudCommand),

    /// Settle a conflict left for a manual decision
    #[command(after_help = "Examples:\n  \
        csync resolve local     Keep this device's data and push it\n  \
        csync resolve remote    Take the cloud's data")]
    Resolve {
        #[arg(value_enum)]
        side: ResolveSide,
    },

    /// Show or edit local data
    #[command(subcommand)]
    Local(LocalCommand),

    /// Sync on the configured interval and drain on reconnect until Ctrl-C
    Run,

    /// Generate shell completions
    #[command(arg_required_else_help = true)]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Offline queue commands.
#[derive(Subcommand)]
pub enum QueueCommand {
    /// List queued changes, oldest first
    List {
        #[arg(long, short, value_enum, default_value = "text")]
        output: OutputFormat,
    },
    /// Drop every queued change
    Clear,
}

/// Sync preference commands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current preferences
    Show {
        #[arg(long, short, value_enum, default_value = "text")]
        output: OutputFormat,
    },
    /// Change one or more preferences
    #[command(
        arg_required_else_help = true,
        after_help = "Examples:\n  \
        csync config set --auto-sync false        Turn off timer syncs\n  \
        csync config set --interval-minutes 15    Sync every 15 minutes\n  \
        csync config set --wifi-only true         Timer syncs only on Wi-Fi\n  \
        csync config set --policy manual          Ask before overwriting"
    )]
    Set {
        /// Enable or disable timer syncs
        #[arg(long, value_name = "BOOL")]
        auto_sync: Option<bool>,

        /// Minutes between timer syncs
        #[arg(long, value_name = "MINUTES", value_parser = clap::value_parser!(u64).range(1..))]
        interval_minutes: Option<u64>,

        /// Only run timer syncs on Wi-Fi
        #[arg(long, value_name = "BOOL")]
        wifi_only: Option<bool>,

        /// Conflict policy (latest, local, cloud, manual)
        #[arg(long, value_parser = parse_policy)]
        policy: Option<ConflictPolicy>,
    },
}

/// Cloud backend commands.
#[derive(Subcommand)]
pub enum CloudCommand {
    /// Upload, read back and delete a test blob
    Test,
}

/// Local data commands.
#[derive(Subcommand)]
pub enum LocalCommand {
    /// Print local data (one category or all)
    Show {
        /// Category (user_progress, study_plan, chat_session, study_group, study_post)
        #[arg(value_parser = parse_entity)]
        category: Option<EntityType>,
    },
    /// Replace one category with a JSON value
    #[command(arg_required_else_help = true)]
    Set {
        #[arg(value_parser = parse_entity)]
        category: EntityType,

        /// JSON value (an array for every category except user_progress)
        json: String,
    },
}

/// Which side of a pending conflict to keep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ResolveSide {
    Local,
    Remote,
}

impl From<ResolveSide> for Side {
    fn from(side: ResolveSide) -> Self {
        match side {
            ResolveSide::Local => Side::Local,
            ResolveSide::Remote => Side::Remote,
        }
    }
}

fn parse_policy(s: &str) -> std::result::Result<ConflictPolicy, String> {
    s.parse().map_err(|e: cs_core::Error| e.to_string())
}

fn parse_entity(s: &str) -> std::result::Result<EntityType, String> {
    s.parse().map_err(|e: cs_core::Error| e.to_string())
}
