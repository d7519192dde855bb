// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Automatic triggers: the interval timer and reconnect drains.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cs_core::KeyValueStore;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::adapter::CloudService;
use super::engine::{DrainOutcome, SyncEngine, SyncOutcome, SyncStatus};
use super::settings::SyncConfig;
use crate::error::Result;
use crate::network::{ConnectionType, NetworkStatus};

/// What a timer tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Auto-sync is turned off.
    Disabled,
    /// Wi-Fi only is set and the current link is not Wi-Fi.
    NotOnWifi,
    /// A cycle was already running.
    Busy,
    Ran(SyncStatus),
}

/// Drives [`SyncEngine`] from the clock and from connectivity changes.
pub struct SyncScheduler<S, K> {
    engine: Arc<SyncEngine<S, K>>,
    user_id: String,
    was_connected: AtomicBool,
}

impl<S: CloudService, K: KeyValueStore> SyncScheduler<S, K> {
    pub fn new(engine: Arc<SyncEngine<S, K>>, user_id: impl Into<String>) -> Self {
        let was_connected = AtomicBool::new(engine.network().is_connected());
        SyncScheduler {
            engine,
            user_id: user_id.into(),
            was_connected,
        }
    }

    pub fn engine(&self) -> &Arc<SyncEngine<S, K>> {
        &self.engine
    }

    fn config(&self) -> Result<SyncConfig> {
        Ok(SyncConfig::load(&**self.engine.store())?)
    }

    /// Handle one timer tick. Preferences are re-read every time.
    pub async fn on_tick(&self) -> Result<TickOutcome> {
        let config = self.config()?;
        if !config.auto_sync_enabled {
            debug!("tick skipped: auto-sync disabled");
            return Ok(TickOutcome::Disabled);
        }

        let connection = self.engine.network().connection_type();
        if config.wifi_only && connection != ConnectionType::Wifi {
            debug!(%connection, "tick skipped: not on wifi");
            return Ok(TickOutcome::NotOnWifi);
        }

        let snapshot = self.engine.local().snapshot(&self.user_id, Utc::now())?;
        Ok(match self.engine.sync(snapshot).await {
            SyncOutcome::Finished(status) => TickOutcome::Ran(status),
            SyncOutcome::Busy => TickOutcome::Busy,
        })
    }

    /// Handle a connectivity report. Drains the offline queue on every
    /// disconnected-to-connected transition.
    pub async fn on_network_change(&self, status: NetworkStatus) -> Option<DrainOutcome> {
        let was_connected = self.was_connected.swap(status.connected, Ordering::AcqRel);
        if !status.connected || was_connected {
            return None;
        }
        info!(connection_type = %status.connection_type, "reconnected, draining offline queue");
        Some(self.engine.drain_offline_queue().await)
    }

    /// Run until `cancel` fires.
    ///
    /// The timer is rebuilt when the configured interval changes.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let mut network_rx = self.engine.network().subscribe();
        let mut period = self.config()?.interval();
        let mut ticker = new_ticker(period);
        info!(interval_secs = period.as_secs(), "scheduler started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("scheduler stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    match self.on_tick().await {
                        Ok(outcome) => debug!(?outcome, "tick handled"),
                        Err(e) => warn!(error = %e, "tick failed"),
                    }
                    match self.config() {
                        Ok(config) if config.interval() != period => {
                            period = config.interval();
                            ticker = new_ticker(period);
                            info!(interval_secs = period.as_secs(), "sync interval changed");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "cannot re-read sync config"),
                    }
                }
                Some(status) = network_rx.recv() => {
                    if let Some(outcome) = self.on_network_change(status).await {
                        debug!(?outcome, "reconnect drain handled");
                    }
                }
            }
        }
    }
}

/// An interval whose first tick is one full period away.
fn new_ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
