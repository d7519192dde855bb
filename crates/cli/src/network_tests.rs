// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    wifi = { "wifi", ConnectionType::Wifi },
    wifi_dash = { "Wi-Fi", ConnectionType::Wifi },
    cellular = { "cellular", ConnectionType::Cellular },
    ethernet = { "ethernet", ConnectionType::Ethernet },
    none = { "none", ConnectionType::None },
)]
fn connection_type_parse(input: &str, expected: ConnectionType) {
    assert_eq!(input.parse::<ConnectionType>().unwrap(), expected);
}

#[test]
fn connection_type_rejects_unknown() {
    assert!("satellite".parse::<ConnectionType>().is_err());
}

#[test]
fn starts_disconnected() {
    let observer = NetworkObserver::new();
    assert!(!observer.is_connected());
    assert_eq!(observer.connection_type(), ConnectionType::None);
}

#[test]
fn report_updates_current_state() {
    let observer = NetworkObserver::new();
    observer.report(NetworkStatus::connected(ConnectionType::Cellular));
    assert!(observer.is_connected());
    assert_eq!(observer.connection_type(), ConnectionType::Cellular);

    observer.report(NetworkStatus::disconnected());
    assert_eq!(observer.status(), NetworkStatus::disconnected());
}

#[test]
fn with_status_presets_state() {
    let observer = NetworkObserver::with_status(NetworkStatus::connected(ConnectionType::Wifi));
    assert!(observer.is_connected());
    assert_eq!(observer.connection_type(), ConnectionType::Wifi);
}

#[tokio::test]
async fn subscribers_receive_reports_in_order_including_duplicates() {
    let observer = NetworkObserver::new();
    let mut rx = observer.subscribe();

    let reports = [
        NetworkStatus::connected(ConnectionType::Wifi),
        NetworkStatus::connected(ConnectionType::Wifi),
        NetworkStatus::disconnected(),
        NetworkStatus::connected(ConnectionType::Ethernet),
    ];
    for status in reports {
        observer.report(status);
    }

    for expected in reports {
        assert_eq!(rx.recv().await.unwrap(), expected);
    }
}

#[tokio::test]
async fn probe_reports_reachable_listener() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            if listener.accept().await.is_err() {
                return;
            }
        }
    });

    let observer = Arc::new(NetworkObserver::new());
    let mut rx = observer.subscribe();
    let cancel = CancellationToken::new();
    let handle = spawn_probe(
        Arc::clone(&observer),
        ProbeConfig {
            addr: addr.to_string(),
            connection_type: ConnectionType::Ethernet,
            interval: Duration::from_millis(50),
            connect_timeout: Duration::from_secs(1),
        },
        cancel.clone(),
    );

    let status = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status, NetworkStatus::connected(ConnectionType::Ethernet));
    assert!(observer.is_connected());

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn probe_once_fails_for_closed_port() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    assert!(!probe_once(&addr.to_string(), Duration::from_secs(1)).await);
}

#[tokio::test]
async fn probe_once_resolves_host_names() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    assert!(probe_once(&format!("localhost:{}", port), Duration::from_secs(1)).await);
}
