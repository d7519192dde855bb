// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `csync run`: the long-running scheduler.

use std::path::Path;
use std::sync::Arc;

use cs_core::KeyValueStore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::Result;
use crate::network::{spawn_probe, NetworkObserver, ProbeConfig};
use crate::sync::{CloudService, DrainOutcome, SyncConfig, SyncEngine, SyncScheduler};

use super::config::format_interval;
use super::{runtime, Context};

pub fn run(start: &Path) -> Result<()> {
    let ctx = Context::open(start)?;
    let rt = runtime()?;
    rt.block_on(async {
        let probe = ctx.config.network.probe()?;
        let network = Arc::new(NetworkObserver::with_status(ctx.network_status().await?));
        let engine = Arc::new(ctx.engine(network));

        let prefs = SyncConfig::load(&*ctx.store)?;
        println!(
            "Syncing {} every {} (Ctrl-C to stop)",
            ctx.config.user_id,
            format_interval(prefs.sync_interval_secs)
        );

        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("interrupt received, shutting down");
                    cancel.cancel();
                }
            }
        });

        serve(engine, &ctx.config.user_id, probe, cancel).await
    })
}

/// Drive `engine` until `cancel` fires.
///
/// Changes left in the queue by earlier runs are pushed first when the
/// device starts online. With a probe, connectivity is re-checked on its
/// interval; without one it stays as the engine's observer reports it.
pub(crate) async fn serve<S, K>(
    engine: Arc<SyncEngine<S, K>>,
    user_id: &str,
    probe: Option<ProbeConfig>,
    cancel: CancellationToken,
) -> Result<()>
where
    S: CloudService,
    K: KeyValueStore,
{
    if engine.network().is_connected() {
        match engine.drain_offline_queue().await {
            DrainOutcome::Completed(report) if report.succeeded + report.failed > 0 => {
                info!(?report, "pushed changes queued by an earlier run")
            }
            DrainOutcome::Failed(reason) => warn!(%reason, "startup drain failed"),
            _ => {}
        }
    }

    let scheduler = SyncScheduler::new(Arc::clone(&engine), user_id);
    let probe_task =
        probe.map(|config| spawn_probe(Arc::clone(engine.network()), config, cancel.clone()));

    let result = scheduler.run(cancel.clone()).await;
    cancel.cancel();
    if let Some(task) = probe_task {
        if let Err(e) = task.await {
            warn!(error = %e, "network probe task failed");
        }
    }
    result
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
