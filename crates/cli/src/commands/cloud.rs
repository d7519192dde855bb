// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use crate::cli::CloudCommand;
use crate::error::Result;
use crate::sync::{check_connection, create_service, CloudService};

use super::{runtime, Context};

pub fn run(start: &Path, cmd: CloudCommand) -> Result<()> {
    match cmd {
        CloudCommand::Test => test(start),
    }
}

fn test(start: &Path) -> Result<()> {
    let ctx = Context::open(start)?;
    let service = create_service(&ctx.config.cloud, &ctx.work_dir);
    let rt = runtime()?;
    let path = rt.block_on(check_connection(&service))?;
    println!(
        "Connection OK: {} backend stored, returned and deleted {}",
        service.name(),
        path
    );
    Ok(())
}

#[cfg(test)]
#[path = "cloud_tests.rs"]
mod tests;
