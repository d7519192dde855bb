// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use clap::Parser;
use csync::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    // one-shot commands only surface warnings; the scheduler logs its cycles
    let level = if matches!(cli.command, Command::Run) {
        "info"
    } else {
        "warn"
    };
    csync::init_logging(level);

    if let Err(e) = csync::run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
