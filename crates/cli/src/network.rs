// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity state shared between the platform reporter and the sync
//! layer.
//!
//! Reads go through atomics so the engine can check connectivity without
//! taking a lock. Reports are serialized so subscribers observe changes in
//! the order the platform produced them.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::Error;
use crate::events::EventBus;

const TYPE_NONE: u8 = 0;
const TYPE_WIFI: u8 = 1;
const TYPE_CELLULAR: u8 = 2;
const TYPE_ETHERNET: u8 = 3;

/// Kind of link the device is using.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Wifi,
    Cellular,
    Ethernet,
    #[default]
    None,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Wifi => "wifi",
            ConnectionType::Cellular => "cellular",
            ConnectionType::Ethernet => "ethernet",
            ConnectionType::None => "none",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            ConnectionType::None => TYPE_NONE,
            ConnectionType::Wifi => TYPE_WIFI,
            ConnectionType::Cellular => TYPE_CELLULAR,
            ConnectionType::Ethernet => TYPE_ETHERNET,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            TYPE_WIFI => ConnectionType::Wifi,
            TYPE_CELLULAR => ConnectionType::Cellular,
            TYPE_ETHERNET => ConnectionType::Ethernet,
            _ => ConnectionType::None,
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wifi" | "wi-fi" => Ok(ConnectionType::Wifi),
            "cellular" | "cell" => Ok(ConnectionType::Cellular),
            "ethernet" | "wired" => Ok(ConnectionType::Ethernet),
            "none" => Ok(ConnectionType::None),
            _ => Err(Error::InvalidValue {
                field: "connection_type",
                reason: format!("'{}' is not one of wifi, cellular, ethernet, none", s),
            }),
        }
    }
}

/// One connectivity report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStatus {
    pub connected: bool,
    pub connection_type: ConnectionType,
}

impl NetworkStatus {
    pub fn connected(connection_type: ConnectionType) -> Self {
        NetworkStatus {
            connected: true,
            connection_type,
        }
    }

    pub fn disconnected() -> Self {
        NetworkStatus {
            connected: false,
            connection_type: ConnectionType::None,
        }
    }
}

/// Current connectivity plus a subscription point for changes.
///
/// Starts disconnected until the first report arrives.
pub struct NetworkObserver {
    connected: AtomicBool,
    connection_type: AtomicU8,
    report_lock: Mutex<()>,
    events: EventBus<NetworkStatus>,
}

impl NetworkObserver {
    pub fn new() -> Self {
        NetworkObserver {
            connected: AtomicBool::new(false),
            connection_type: AtomicU8::new(TYPE_NONE),
            report_lock: Mutex::new(()),
            events: EventBus::new(),
        }
    }

    /// Observer that already reports `status`, for runs without a probe.
    pub fn with_status(status: NetworkStatus) -> Self {
        let observer = Self::new();
        observer.store(status);
        observer
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn connection_type(&self) -> ConnectionType {
        ConnectionType::from_u8(self.connection_type.load(Ordering::Acquire))
    }

    pub fn status(&self) -> NetworkStatus {
        NetworkStatus {
            connected: self.is_connected(),
            connection_type: self.connection_type(),
        }
    }

    /// Record a platform report and deliver it to every subscriber.
    ///
    /// Every report is delivered, including ones identical to the previous
    /// state.
    pub fn report(&self, status: NetworkStatus) {
        let _ordered = self.report_lock.lock();
        let was_connected = self.is_connected();
        self.store(status);
        if was_connected != status.connected {
            info!(
                connected = status.connected,
                connection_type = %status.connection_type,
                "network state changed"
            );
        }
        self.events.publish(status);
    }

    /// Receive every report made after this call, in report order.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<NetworkStatus> {
        self.events.subscribe()
    }

    fn store(&self, status: NetworkStatus) {
        self.connection_type
            .store(status.connection_type.to_u8(), Ordering::Release);
        self.connected.store(status.connected, Ordering::Release);
    }
}

impl Default for NetworkObserver {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings for the TCP reachability probe.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// `host:port`; names are resolved on every probe.
    pub addr: String,
    /// Link type reported while the probe succeeds.
    pub connection_type: ConnectionType,
    pub interval: Duration,
    pub connect_timeout: Duration,
}

/// Spawn a task that probes `config.addr` on an interval and reports every
/// result to `observer` until `cancel` fires.
pub fn spawn_probe(
    observer: Arc<NetworkObserver>,
    config: ProbeConfig,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = interval.tick() => {}
            }

            let reachable = probe_once(&config.addr, config.connect_timeout).await;
            debug!(addr = %config.addr, reachable, "network probe");
            let status = if reachable {
                NetworkStatus::connected(config.connection_type)
            } else {
                NetworkStatus::disconnected()
            };
            observer.report(status);
        }
    })
}

/// Whether `addr` resolves and accepts a TCP connection within `timeout`.
pub async fn probe_once(addr: &str, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect(addr)).await,
        Ok(Ok(_))
    )
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
