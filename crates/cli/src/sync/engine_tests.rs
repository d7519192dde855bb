// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the sync engine.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use cs_core::{ChangeType, ConflictPolicy, DataChange, EntityType, KeyValueStore, Side, SyncSnapshot};
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;

use super::engine::*;
use super::queue::DrainReport;
use super::settings::SyncConfig;
use super::test_helpers::{
    at, harness, harness_with, make_snapshot, make_test_change, Call, FailingKey, MockService,
};
use crate::error::Error;
use crate::network::{ConnectionType, NetworkObserver, NetworkStatus};

fn drain_events(rx: &mut UnboundedReceiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn progress_values(events: &[SyncEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            SyncEvent::Progress(p) => Some(*p),
            _ => None,
        })
        .collect()
}

fn statuses(events: &[SyncEvent]) -> Vec<SyncStatus> {
    events
        .iter()
        .filter_map(|e| match e {
            SyncEvent::Status(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}

fn set_policy(store: &impl KeyValueStore, policy: ConflictPolicy) {
    SyncConfig {
        conflict_resolution: policy,
        ..SyncConfig::default()
    }
    .save(store)
    .unwrap();
}

#[tokio::test]
async fn offline_sync_queues_snapshot_without_calls() {
    let h = harness_with(NetworkStatus::disconnected());
    let mut rx = h.engine.subscribe();

    let outcome = h.engine.sync(make_snapshot("u1", 10, "local")).await;

    assert_eq!(
        outcome,
        SyncOutcome::Finished(SyncStatus::Failed("offline".into()))
    );
    assert!(h.service.calls().is_empty());

    let queued = h.engine.queue().peek_all().unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].change_type, ChangeType::Update);
    assert_eq!(queued[0].entity_type, EntityType::UserProgress);
    assert_eq!(queued[0].entity_id, "u1");

    let events = drain_events(&mut rx);
    assert_eq!(
        statuses(&events),
        vec![SyncStatus::Syncing, SyncStatus::Failed("offline".into())]
    );
    assert_eq!(h.engine.state().last_sync_time, None);
}

#[tokio::test]
async fn successful_cycle_reports_milestones_and_applies() {
    let h = harness();
    let mut rx = h.engine.subscribe();

    let outcome = h.engine.sync(make_snapshot("u1", 10, "local")).await;
    assert_eq!(outcome, SyncOutcome::Finished(SyncStatus::Success));

    assert_eq!(
        h.service.calls(),
        vec![
            Call::Upload("snapshots/u1".into()),
            Call::Download("snapshots/u1".into()),
        ]
    );

    let events = drain_events(&mut rx);
    let progress = progress_values(&events);
    assert_eq!(progress, vec![0.0, 0.3, 0.6, 0.8, 0.9, 1.0]);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(
        statuses(&events),
        vec![SyncStatus::Syncing, SyncStatus::Success]
    );

    let state = h.engine.state();
    assert_eq!(state.status, SyncStatus::Success);
    assert_eq!(state.progress, 1.0);
    assert!(state.last_sync_time.is_some());

    assert_eq!(
        h.engine.local().category(EntityType::UserProgress).unwrap(),
        json!({ "marker": "local" })
    );
    assert_eq!(
        h.engine.local().last_snapshot().unwrap().unwrap().user_id(),
        "u1"
    );
}

#[tokio::test]
async fn upload_failure_stops_the_cycle() {
    let h = harness();
    h.service.fail_uploads(true);

    let outcome = h.engine.sync(make_snapshot("u1", 10, "local")).await;

    assert_eq!(
        outcome,
        SyncOutcome::Finished(SyncStatus::Failed("upload failed".into()))
    );
    assert_eq!(h.service.calls(), vec![Call::Upload("snapshots/u1".into())]);
    assert_eq!(
        h.engine.local().category(EntityType::UserProgress).unwrap(),
        json!(null)
    );
}

#[tokio::test]
async fn download_failure_keeps_upload_and_skips_apply() {
    let h = harness();
    h.service.fail_downloads(true);
    let snapshot = make_snapshot("u1", 10, "local");

    let outcome = h.engine.sync(snapshot.clone()).await;

    assert_eq!(
        outcome,
        SyncOutcome::Finished(SyncStatus::Failed("download failed".into()))
    );
    assert_eq!(
        h.service.get("snapshots/u1"),
        Some(snapshot.to_bytes().unwrap())
    );
    assert_eq!(
        h.engine.local().category(EntityType::UserProgress).unwrap(),
        json!(null)
    );
    assert!(h.engine.local().last_snapshot().unwrap().is_none());
}

#[tokio::test]
async fn undecodable_remote_is_a_download_failure() {
    let h = harness();
    h.service.serve_remote("snapshots/u1", b"not a snapshot".to_vec());

    let outcome = h.engine.sync(make_snapshot("u1", 10, "local")).await;
    assert_eq!(
        outcome,
        SyncOutcome::Finished(SyncStatus::Failed("download failed".into()))
    );
}

#[tokio::test]
async fn latest_wins_applies_newer_remote() {
    let h = harness();
    let remote = make_snapshot("u1", 100, "remote");
    h.service
        .serve_remote("snapshots/u1", remote.to_bytes().unwrap());

    h.engine.sync(make_snapshot("u1", 50, "local")).await;

    assert_eq!(
        h.engine.local().category(EntityType::UserProgress).unwrap(),
        json!({ "marker": "remote" })
    );
    assert_eq!(
        h.engine.local().category(EntityType::StudyPlan).unwrap(),
        json!([{ "id": "plan-remote" }])
    );
}

#[tokio::test]
async fn cloud_wins_applies_older_remote() {
    let h = harness();
    set_policy(&*h.store, ConflictPolicy::CloudWins);
    let remote = make_snapshot("u1", 1, "remote");
    h.service
        .serve_remote("snapshots/u1", remote.to_bytes().unwrap());

    h.engine.sync(make_snapshot("u1", 50, "local")).await;

    assert_eq!(
        h.engine.local().category(EntityType::UserProgress).unwrap(),
        json!({ "marker": "remote" })
    );
}

#[tokio::test]
async fn local_wins_ignores_newer_remote() {
    let h = harness();
    set_policy(&*h.store, ConflictPolicy::LocalWins);
    let remote = make_snapshot("u1", 100, "remote");
    h.service
        .serve_remote("snapshots/u1", remote.to_bytes().unwrap());

    h.engine.sync(make_snapshot("u1", 50, "local")).await;

    assert_eq!(
        h.engine.local().category(EntityType::UserProgress).unwrap(),
        json!({ "marker": "local" })
    );
}

#[tokio::test]
async fn manual_policy_suspends_until_resolved() {
    let h = harness();
    set_policy(&*h.store, ConflictPolicy::Manual);
    let remote = make_snapshot("u1", 100, "remote");
    h.service
        .serve_remote("snapshots/u1", remote.to_bytes().unwrap());

    let outcome = h.engine.sync(make_snapshot("u1", 50, "local")).await;
    assert_eq!(
        outcome,
        SyncOutcome::Finished(SyncStatus::Failed("manual resolution required".into()))
    );
    assert_eq!(
        h.engine.local().category(EntityType::UserProgress).unwrap(),
        json!(null)
    );

    let pending = h.engine.pending_conflict().unwrap().unwrap();
    assert_eq!(pending.local.last_sync_time(), at(50));
    assert_eq!(pending.remote.last_sync_time(), at(100));

    let outcome = h.engine.resolve_pending(Side::Remote).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Finished(SyncStatus::Success));
    assert_eq!(
        h.engine.local().category(EntityType::UserProgress).unwrap(),
        json!({ "marker": "remote" })
    );
    assert!(h.engine.pending_conflict().unwrap().is_none());
}

#[tokio::test]
async fn resolving_for_local_pushes_it_again() {
    let h = harness();
    set_policy(&*h.store, ConflictPolicy::Manual);
    let remote = make_snapshot("u1", 100, "remote");
    h.service
        .serve_remote("snapshots/u1", remote.to_bytes().unwrap());
    let local = make_snapshot("u1", 50, "local");
    h.engine.sync(local.clone()).await;

    h.engine.resolve_pending(Side::Local).await.unwrap();

    let uploads = h
        .service
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Upload(_)))
        .count();
    assert_eq!(uploads, 2);
    assert_eq!(h.service.get("snapshots/u1"), Some(local.to_bytes().unwrap()));
    assert_eq!(
        h.engine.local().category(EntityType::UserProgress).unwrap(),
        json!({ "marker": "local" })
    );
}

#[tokio::test]
async fn resolve_pending_without_conflict_errors() {
    let h = harness();
    let result = h.engine.resolve_pending(Side::Local).await;
    assert!(matches!(result, Err(Error::NoPendingConflict)));
    assert!(!h.engine.is_syncing());
}

#[tokio::test(start_paused = true)]
async fn second_request_while_syncing_is_rejected() {
    let h = harness();
    h.service.set_latency(Duration::from_secs(5));
    let mut rx = h.engine.subscribe();

    let engine = Arc::clone(&h.engine);
    let first = tokio::spawn(async move { engine.sync(make_snapshot("u1", 10, "first")).await });

    // wait until the first cycle is in flight
    loop {
        if let Some(SyncEvent::Status(SyncStatus::Syncing)) = rx.recv().await {
            break;
        }
    }
    assert!(h.engine.is_syncing());
    assert_eq!(
        h.engine.sync(make_snapshot("u1", 20, "second")).await,
        SyncOutcome::Busy
    );
    assert_eq!(h.engine.drain_offline_queue().await, DrainOutcome::Busy);
    assert_eq!(
        h.engine.resolve_pending(Side::Local).await.unwrap(),
        SyncOutcome::Busy
    );

    assert_eq!(
        first.await.unwrap(),
        SyncOutcome::Finished(SyncStatus::Success)
    );
    assert!(!h.engine.is_syncing());
    // only the first cycle reached the service
    assert_eq!(h.service.calls().len(), 2);
}

#[tokio::test]
async fn drain_replays_queue_in_order() {
    let h = harness();
    for id in ["a", "b", "c"] {
        h.engine.queue().enqueue(make_test_change(id)).unwrap();
    }
    let mut rx = h.engine.subscribe();

    let outcome = h.engine.drain_offline_queue().await;

    assert_eq!(
        outcome,
        DrainOutcome::Completed(DrainReport {
            succeeded: 3,
            failed: 0,
            remaining: 0
        })
    );
    assert_eq!(
        h.service.calls(),
        vec![
            Call::Upload("plans/a".into()),
            Call::Upload("plans/b".into()),
            Call::Upload("plans/c".into()),
        ]
    );
    assert!(h.engine.queue().is_empty().unwrap());

    let events = drain_events(&mut rx);
    let progress = progress_values(&events);
    assert_eq!(progress.first(), Some(&0.0));
    assert_eq!(progress.last(), Some(&1.0));
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(
        statuses(&events),
        vec![SyncStatus::Syncing, SyncStatus::Success]
    );
}

#[tokio::test]
async fn drain_keeps_failed_entries() {
    let h = harness();
    for id in ["a", "b", "c"] {
        h.engine.queue().enqueue(make_test_change(id)).unwrap();
    }
    h.service.fail_path("plans/b");

    let outcome = h.engine.drain_offline_queue().await;

    assert_eq!(
        outcome,
        DrainOutcome::Completed(DrainReport {
            succeeded: 2,
            failed: 1,
            remaining: 1
        })
    );
    let left = h.engine.queue().peek_all().unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].entity_id, "b");
    assert_eq!(
        h.engine.state().status,
        SyncStatus::Failed("1 queued changes failed".into())
    );
}

#[tokio::test]
async fn drain_of_empty_queue_is_silent() {
    let h = harness();
    let mut rx = h.engine.subscribe();

    let outcome = h.engine.drain_offline_queue().await;

    assert_eq!(outcome, DrainOutcome::Completed(DrainReport::default()));
    assert!(drain_events(&mut rx).is_empty());
    assert_eq!(h.engine.state().status, SyncStatus::Idle);
}

#[tokio::test]
async fn drain_while_offline_does_nothing() {
    let h = harness_with(NetworkStatus::disconnected());
    h.engine.queue().enqueue(make_test_change("a")).unwrap();

    let outcome = h.engine.drain_offline_queue().await;

    assert_eq!(outcome, DrainOutcome::Failed("offline".into()));
    assert!(h.service.calls().is_empty());
    assert_eq!(h.engine.queue().len().unwrap(), 1);
}

#[tokio::test]
async fn drain_applies_deletes() {
    let h = harness();
    h.service.put("chats/c1", b"old".to_vec());
    let change = DataChange::new(
        ChangeType::Delete,
        EntityType::ChatSession,
        "c1",
        at(0),
        String::new(),
    );
    h.engine.queue().enqueue(change).unwrap();

    h.engine.drain_offline_queue().await;

    assert_eq!(h.service.calls(), vec![Call::Delete("chats/c1".into())]);
    assert_eq!(h.service.get("chats/c1"), None);
}

#[tokio::test]
async fn offline_snapshot_is_replayed_after_reconnect() {
    let h = harness_with(NetworkStatus::disconnected());
    let snapshot = make_snapshot("u1", 10, "offline");
    h.engine.sync(snapshot.clone()).await;

    h.network
        .report(NetworkStatus::connected(ConnectionType::Wifi));
    h.engine.drain_offline_queue().await;

    let stored = h.service.get("snapshots/u1").unwrap();
    assert_eq!(SyncSnapshot::from_bytes(&stored).unwrap(), snapshot);
}

#[tokio::test]
async fn reset_status_returns_to_idle() {
    let h = harness();
    h.engine.sync(make_snapshot("u1", 10, "local")).await;
    h.engine.reset_status();

    let state = h.engine.state();
    assert_eq!(state.status, SyncStatus::Idle);
    assert_eq!(state.progress, 0.0);
    assert!(state.last_sync_time.is_some());
}

#[tokio::test]
async fn state_survives_engine_restart() {
    let h = harness();
    h.engine.sync(make_snapshot("u1", 10, "local")).await;
    let before = h.engine.state();

    let engine = SyncEngine::new(
        h.service.clone(),
        Arc::clone(&h.store),
        Arc::clone(&h.network),
    );
    assert_eq!(engine.state(), before);
}

#[test]
fn status_display() {
    assert_eq!(SyncStatus::Idle.to_string(), "idle");
    assert_eq!(
        SyncStatus::Failed("offline".into()).to_string(),
        "failed: offline"
    );
}

#[test]
fn status_serializes_with_reason() {
    let json = serde_json::to_value(SyncStatus::Failed("offline".into())).unwrap();
    assert_eq!(json, json!({ "status": "failed", "reason": "offline" }));
    let json = serde_json::to_value(SyncStatus::Success).unwrap();
    assert_eq!(json, json!({ "status": "success" }));
}

#[tokio::test]
async fn failing_category_is_reported_and_cycle_still_succeeds() {
    let store = Arc::new(FailingKey::new("ChatSessions"));
    let engine = SyncEngine::new(
        MockService::new(),
        Arc::clone(&store),
        Arc::new(NetworkObserver::with_status(NetworkStatus::connected(
            ConnectionType::Wifi,
        ))),
    );
    let mut rx = engine.subscribe();

    let outcome = engine.sync(make_snapshot("u1", 10, "x")).await;

    assert_eq!(outcome, SyncOutcome::Finished(SyncStatus::Success));
    let events = drain_events(&mut rx);
    let failed: Vec<EntityType> = events
        .iter()
        .filter_map(|e| match e {
            SyncEvent::CategoryFailed { category, .. } => Some(*category),
            _ => None,
        })
        .collect();
    assert_eq!(failed, vec![EntityType::ChatSession]);
    assert_eq!(statuses(&events).last(), Some(&SyncStatus::Success));
    // the other categories were still written
    assert_eq!(
        engine.local().category(EntityType::StudyPlan).unwrap(),
        json!([{ "id": "plan-x" }])
    );
}

fn locked_engine(
    lock: &std::path::Path,
) -> (MockService, Arc<SyncEngine<MockService, cs_core::MemoryStore>>) {
    let service = MockService::new();
    let engine = SyncEngine::new(
        service.clone(),
        Arc::new(cs_core::MemoryStore::new()),
        Arc::new(NetworkObserver::with_status(NetworkStatus::connected(
            ConnectionType::Wifi,
        ))),
    )
    .with_cycle_lock(lock);
    (service, Arc::new(engine))
}

#[tokio::test(start_paused = true)]
async fn engines_sharing_a_lock_file_run_one_cycle_at_a_time() {
    let dir = tempfile::tempdir().unwrap();
    let lock = dir.path().join("sync.lock");
    let (first_service, first) = locked_engine(&lock);
    let (second_service, second) = locked_engine(&lock);
    first_service.set_latency(Duration::from_secs(5));
    let mut rx = first.subscribe();

    let running = Arc::clone(&first);
    let task = tokio::spawn(async move { running.sync(make_snapshot("u1", 10, "first")).await });
    loop {
        if let Some(SyncEvent::Status(SyncStatus::Syncing)) = rx.recv().await {
            break;
        }
    }

    // the second engine has its own in-process flag; only the file stops it
    assert!(!second.is_syncing());
    assert_eq!(
        second.sync(make_snapshot("u1", 20, "second")).await,
        SyncOutcome::Busy
    );
    assert_eq!(second.drain_offline_queue().await, DrainOutcome::Busy);
    assert!(second_service.calls().is_empty());

    assert_eq!(
        task.await.unwrap(),
        SyncOutcome::Finished(SyncStatus::Success)
    );
    assert_eq!(
        second.sync(make_snapshot("u1", 30, "third")).await,
        SyncOutcome::Finished(SyncStatus::Success)
    );
}

#[tokio::test]
async fn lock_held_elsewhere_makes_every_entry_point_busy() {
    use fs2::FileExt;

    let dir = tempfile::tempdir().unwrap();
    let lock = dir.path().join("sync.lock");
    let held = std::fs::File::create(&lock).unwrap();
    held.lock_exclusive().unwrap();
    let (service, engine) = locked_engine(&lock);

    assert_eq!(
        engine.sync(make_snapshot("u1", 10, "x")).await,
        SyncOutcome::Busy
    );
    assert_eq!(
        engine.resolve_pending(Side::Local).await.unwrap(),
        SyncOutcome::Busy
    );
    assert!(service.calls().is_empty());
    assert!(!engine.is_syncing());

    FileExt::unlock(&held).unwrap();
    assert_eq!(
        engine.sync(make_snapshot("u1", 10, "x")).await,
        SyncOutcome::Finished(SyncStatus::Success)
    );
}

#[tokio::test]
async fn category_sync_applies_only_chosen_categories() {
    let h = harness();
    h.engine
        .local()
        .set_category(EntityType::ChatSession, &json!([{ "id": "chat-mine" }]))
        .unwrap();
    let remote = make_snapshot("u1", 100, "remote");
    h.service
        .serve_remote("snapshots/u1", remote.to_bytes().unwrap());

    let outcome = h
        .engine
        .sync_categories(make_snapshot("u1", 50, "local"), &[EntityType::StudyPlan])
        .await;

    assert_eq!(outcome, SyncOutcome::Finished(SyncStatus::Success));
    assert_eq!(
        h.engine.local().category(EntityType::StudyPlan).unwrap(),
        json!([{ "id": "plan-remote" }])
    );
    assert_eq!(
        h.engine.local().category(EntityType::ChatSession).unwrap(),
        json!([{ "id": "chat-mine" }])
    );
}

#[tokio::test]
async fn manual_conflict_from_category_sync_keeps_its_scope() {
    let h = harness();
    set_policy(&*h.store, ConflictPolicy::Manual);
    let remote = make_snapshot("u1", 100, "remote");
    h.service
        .serve_remote("snapshots/u1", remote.to_bytes().unwrap());

    h.engine
        .sync_categories(make_snapshot("u1", 50, "local"), &[EntityType::UserProgress])
        .await;
    let scope: Vec<EntityType> = h.store.get_json(PENDING_SCOPE_KEY).unwrap().unwrap();
    assert_eq!(scope, vec![EntityType::UserProgress]);

    h.engine.resolve_pending(Side::Remote).await.unwrap();

    assert_eq!(
        h.engine.local().category(EntityType::UserProgress).unwrap(),
        json!({ "marker": "remote" })
    );
    assert_eq!(
        h.engine.local().category(EntityType::StudyPlan).unwrap(),
        json!([])
    );
    assert!(h.store.get(PENDING_SCOPE_KEY).unwrap().is_none());
}
