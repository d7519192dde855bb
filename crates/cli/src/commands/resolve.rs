// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::sync::Arc;

use cs_core::Side;

use crate::error::{Error, Result};
use crate::network::NetworkObserver;
use crate::sync::{SyncOutcome, SyncStatus};

use super::{runtime, Context};

pub fn run(start: &Path, side: Side) -> Result<()> {
    let ctx = Context::open(start)?;
    let rt = runtime()?;
    rt.block_on(async {
        let status = ctx.network_status().await?;
        let engine = ctx.engine(Arc::new(NetworkObserver::with_status(status)));
        match engine.resolve_pending(side).await? {
            SyncOutcome::Finished(SyncStatus::Success) => {
                println!("Conflict resolved: kept {} data", side);
                Ok(())
            }
            SyncOutcome::Finished(SyncStatus::Failed(reason)) => Err(Error::SyncFailed(reason)),
            SyncOutcome::Finished(status) => Err(Error::SyncFailed(status.to_string())),
            SyncOutcome::Busy => {
                println!("Another sync is already running");
                Ok(())
            }
        }
    })
}
