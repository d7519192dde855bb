// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use cs_core::{ChangeType, DataChange, EntityType, KeyValueStore, MemoryStore, SyncSnapshot};
use serde_json::json;

use super::adapter::{AdapterError, CloudService, ServiceFuture};
use super::engine::SyncEngine;
use crate::network::{ConnectionType, NetworkObserver, NetworkStatus};

/// A fixed point in time, `secs` seconds after 2026-01-01T00:00:00Z.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_767_225_600 + secs, 0)
        .single()
        .unwrap_or_default()
}

/// Create a test change for a study plan with the given entity id.
pub fn make_test_change(entity_id: &str) -> DataChange {
    DataChange::new(
        ChangeType::Update,
        EntityType::StudyPlan,
        entity_id,
        at(0),
        json!({ "id": entity_id }).to_string(),
    )
}

/// Create a snapshot for `user_id` taken `secs` after the base time.
pub fn make_snapshot(user_id: &str, secs: i64, marker: &str) -> SyncSnapshot {
    SyncSnapshot::builder(user_id, at(secs))
        .user_progress(json!({ "marker": marker }))
        .study_plans(vec![json!({ "id": format!("plan-{}", marker) })])
        .chat_sessions(vec![json!({ "id": format!("chat-{}", marker) })])
        .build()
}

/// Everything an engine test needs.
pub struct Harness {
    pub service: MockService,
    pub store: Arc<MemoryStore>,
    pub network: Arc<NetworkObserver>,
    pub engine: Arc<SyncEngine<MockService, MemoryStore>>,
}

/// Engine over a mock service and an in-memory store, online on wifi.
pub fn harness() -> Harness {
    harness_with(NetworkStatus::connected(ConnectionType::Wifi))
}

pub fn harness_with(status: NetworkStatus) -> Harness {
    let service = MockService::new();
    let store = Arc::new(MemoryStore::new());
    let network = Arc::new(NetworkObserver::with_status(status));
    let engine = Arc::new(SyncEngine::new(
        service.clone(),
        Arc::clone(&store),
        Arc::clone(&network),
    ));
    Harness {
        service,
        store,
        network,
        engine,
    }
}

/// Store that refuses writes to one key.
pub struct FailingKey {
    inner: MemoryStore,
    key: &'static str,
}

impl FailingKey {
    pub fn new(key: &'static str) -> Self {
        FailingKey {
            inner: MemoryStore::new(),
            key,
        }
    }

    fn check(&self, key: &str) -> cs_core::Result<()> {
        if key == self.key {
            return Err(cs_core::Error::StorageUnavailable("disk full".into()));
        }
        Ok(())
    }
}

impl KeyValueStore for FailingKey {
    fn get(&self, key: &str) -> cs_core::Result<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> cs_core::Result<()> {
        self.check(key)?;
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> cs_core::Result<()> {
        self.inner.remove(key)
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<Vec<u8>>) -> cs_core::Result<Vec<u8>>,
    ) -> cs_core::Result<()> {
        self.check(key)?;
        self.inner.update(key, f)
    }
}

/// One call observed by [`MockService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Upload(String),
    Download(String),
    Delete(String),
    List(String),
}

#[derive(Default)]
struct MockState {
    blobs: BTreeMap<String, Vec<u8>>,
    served: BTreeMap<String, Vec<u8>>,
    calls: Vec<Call>,
    fail_uploads: bool,
    fail_downloads: bool,
    failing_paths: HashSet<String>,
    latency: Option<Duration>,
}

/// Scripted cloud service that records every call.
///
/// Behaves like an in-memory store unless told to fail. Clones share state,
/// so a test can keep a handle while the engine owns another.
#[derive(Clone, Default)]
pub struct MockService {
    state: Arc<Mutex<MockState>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn put(&self, path: &str, payload: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .blobs
            .insert(path.to_string(), payload);
    }

    /// Answer downloads of `path` with `payload` no matter what was
    /// uploaded, as if another device wrote it in between.
    pub fn serve_remote(&self, path: &str, payload: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .served
            .insert(path.to_string(), payload);
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().blobs.get(path).cloned()
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.state.lock().unwrap().fail_uploads = fail;
    }

    pub fn fail_downloads(&self, fail: bool) {
        self.state.lock().unwrap().fail_downloads = fail;
    }

    /// Make every call on `path` fail.
    pub fn fail_path(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_paths
            .insert(path.to_string());
    }

    /// Delay every call by `latency` before it runs.
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().unwrap().latency = Some(latency);
    }

    async fn begin(&self, call: Call) -> MutexGuard<'_, MockState> {
        let latency = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call);
            state.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.state.lock().unwrap()
    }
}

fn scripted() -> AdapterError {
    AdapterError::Backend("scripted failure".to_string())
}

impl CloudService for MockService {
    fn upload<'a>(&'a self, path: &'a str, payload: Vec<u8>) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.begin(Call::Upload(path.to_string())).await;
            if state.fail_uploads || state.failing_paths.contains(path) {
                return Err(scripted());
            }
            state.blobs.insert(path.to_string(), payload);
            Ok(())
        })
    }

    fn download<'a>(&'a self, path: &'a str) -> ServiceFuture<'a, Option<Vec<u8>>> {
        Box::pin(async move {
            let state = self.begin(Call::Download(path.to_string())).await;
            if state.fail_downloads || state.failing_paths.contains(path) {
                return Err(scripted());
            }
            Ok(state
                .served
                .get(path)
                .or_else(|| state.blobs.get(path))
                .cloned())
        })
    }

    fn delete<'a>(&'a self, path: &'a str) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.begin(Call::Delete(path.to_string())).await;
            if state.failing_paths.contains(path) {
                return Err(scripted());
            }
            state.blobs.remove(path);
            Ok(())
        })
    }

    fn list<'a>(&'a self, prefix: &'a str) -> ServiceFuture<'a, Vec<String>> {
        Box::pin(async move {
            let state = self.begin(Call::List(prefix.to_string())).await;
            let dir = format!("{}/", prefix.trim_end_matches('/'));
            Ok(state
                .blobs
                .keys()
                .filter_map(|k| k.strip_prefix(&dir))
                .map(|rest| rest.split('/').next().unwrap_or(rest).to_string())
                .collect())
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
