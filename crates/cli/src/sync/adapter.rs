// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Cloud service abstraction.
//!
//! The engine only speaks logical `PUT/GET/DELETE/LIST path`. Backends are
//! interchangeable:
//! - [`DirectoryService`] keeps blobs as files under a root directory
//! - [`MemoryService`] keeps blobs in process memory
//!
//! [`TimeoutService`] wraps any backend so that every call has bounded
//! latency. Errors are transient from the caller's point of view; nothing in
//! this module retries.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::CloudConfig;

/// Error type for cloud service operations.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The backend could not be reached.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The call did not finish within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The logical path is empty or escapes the service root.
    #[error("invalid path: '{0}'")]
    InvalidPath(String),

    /// I/O error from a file-backed service.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for cloud service operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Boxed future returned by [`CloudService`] methods.
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = AdapterResult<T>> + Send + 'a>>;

/// Pluggable remote blob store.
pub trait CloudService: Send + Sync {
    /// Store `payload` at `path`, replacing what was there.
    fn upload<'a>(&'a self, path: &'a str, payload: Vec<u8>) -> ServiceFuture<'a, ()>;

    /// Fetch the blob at `path`. `None` if nothing is stored there.
    fn download<'a>(&'a self, path: &'a str) -> ServiceFuture<'a, Option<Vec<u8>>>;

    /// Remove the blob at `path`. Deleting a missing blob succeeds.
    fn delete<'a>(&'a self, path: &'a str) -> ServiceFuture<'a, ()>;

    /// Names directly under `prefix`, sorted.
    fn list<'a>(&'a self, prefix: &'a str) -> ServiceFuture<'a, Vec<String>>;

    /// Short backend name for logs and status output.
    fn name(&self) -> &'static str;
}

impl<S: CloudService + ?Sized> CloudService for Box<S> {
    fn upload<'a>(&'a self, path: &'a str, payload: Vec<u8>) -> ServiceFuture<'a, ()> {
        (**self).upload(path, payload)
    }

    fn download<'a>(&'a self, path: &'a str) -> ServiceFuture<'a, Option<Vec<u8>>> {
        (**self).download(path)
    }

    fn delete<'a>(&'a self, path: &'a str) -> ServiceFuture<'a, ()> {
        (**self).delete(path)
    }

    fn list<'a>(&'a self, prefix: &'a str) -> ServiceFuture<'a, Vec<String>> {
        (**self).list(prefix)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<S: CloudService + ?Sized> CloudService for Arc<S> {
    fn upload<'a>(&'a self, path: &'a str, payload: Vec<u8>) -> ServiceFuture<'a, ()> {
        (**self).upload(path, payload)
    }

    fn download<'a>(&'a self, path: &'a str) -> ServiceFuture<'a, Option<Vec<u8>>> {
        (**self).download(path)
    }

    fn delete<'a>(&'a self, path: &'a str) -> ServiceFuture<'a, ()> {
        (**self).delete(path)
    }

    fn list<'a>(&'a self, prefix: &'a str) -> ServiceFuture<'a, Vec<String>> {
        (**self).list(prefix)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Split a logical path into validated segments.
///
/// Leading and trailing slashes are ignored. `.`/`..`, empty segments and
/// backslashes are rejected. An empty path is only valid when `allow_root`.
fn segments(path: &str, allow_root: bool) -> AdapterResult<Vec<&str>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return if allow_root {
            Ok(Vec::new())
        } else {
            Err(AdapterError::InvalidPath(path.to_string()))
        };
    }

    let parts: Vec<&str> = trimmed.split('/').collect();
    let bad = parts
        .iter()
        .any(|p| p.is_empty() || *p == "." || *p == ".." || p.contains('\\'));
    if bad {
        return Err(AdapterError::InvalidPath(path.to_string()));
    }
    Ok(parts)
}

/// Blobs stored as files below a root directory.
///
/// `snapshots/u1` maps to `<root>/snapshots/u1`.
#[derive(Debug, Clone)]
pub struct DirectoryService {
    root: PathBuf,
}

impl DirectoryService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryService { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str, allow_root: bool) -> AdapterResult<PathBuf> {
        let mut full = self.root.clone();
        for part in segments(path, allow_root)? {
            if !matches!(Path::new(part).components().next(), Some(Component::Normal(_))) {
                return Err(AdapterError::InvalidPath(path.to_string()));
            }
            full.push(part);
        }
        Ok(full)
    }
}

impl CloudService for DirectoryService {
    fn upload<'a>(&'a self, path: &'a str, payload: Vec<u8>) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            let target = self.resolve(path, false)?;
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            // Write then rename so readers never see a partial blob.
            let mut tmp = target.clone().into_os_string();
            tmp.push(".partial");
            let tmp = PathBuf::from(tmp);
            tokio::fs::write(&tmp, &payload).await?;
            tokio::fs::rename(&tmp, &target).await?;
            Ok(())
        })
    }

    fn download<'a>(&'a self, path: &'a str) -> ServiceFuture<'a, Option<Vec<u8>>> {
        Box::pin(async move {
            let target = self.resolve(path, false)?;
            match tokio::fs::read(&target).await {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn delete<'a>(&'a self, path: &'a str) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            let target = self.resolve(path, false)?;
            match tokio::fs::remove_file(&target).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn list<'a>(&'a self, prefix: &'a str) -> ServiceFuture<'a, Vec<String>> {
        Box::pin(async move {
            let dir = self.resolve(prefix, true)?;
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };

            let mut names = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.ends_with(".partial") {
                    continue;
                }
                names.push(name);
            }
            names.sort();
            Ok(names)
        })
    }

    fn name(&self) -> &'static str {
        "directory"
    }
}

/// Blobs kept in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryService {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_blobs<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, Vec<u8>>) -> T,
    ) -> AdapterResult<T> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| AdapterError::Unavailable("memory service lock poisoned".to_string()))?;
        Ok(f(&mut blobs))
    }
}

/// Canonical key for a logical path.
fn memory_key(path: &str) -> AdapterResult<String> {
    Ok(segments(path, false)?.join("/"))
}

/// Names directly under `prefix` among `keys`.
fn children<'k>(keys: impl Iterator<Item = &'k String>, prefix: &[&str]) -> Vec<String> {
    let mut names = BTreeSet::new();
    for key in keys {
        let parts: Vec<&str> = key.split('/').collect();
        if parts.len() > prefix.len() && parts[..prefix.len()] == *prefix {
            names.insert(parts[prefix.len()].to_string());
        }
    }
    names.into_iter().collect()
}

impl CloudService for MemoryService {
    fn upload<'a>(&'a self, path: &'a str, payload: Vec<u8>) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            let key = memory_key(path)?;
            self.with_blobs(|blobs| {
                blobs.insert(key, payload);
            })
        })
    }

    fn download<'a>(&'a self, path: &'a str) -> ServiceFuture<'a, Option<Vec<u8>>> {
        Box::pin(async move {
            let key = memory_key(path)?;
            self.with_blobs(|blobs| blobs.get(&key).cloned())
        })
    }

    fn delete<'a>(&'a self, path: &'a str) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            let key = memory_key(path)?;
            self.with_blobs(|blobs| {
                blobs.remove(&key);
            })
        })
    }

    fn list<'a>(&'a self, prefix: &'a str) -> ServiceFuture<'a, Vec<String>> {
        Box::pin(async move {
            let prefix = segments(prefix, true)?;
            self.with_blobs(|blobs| children(blobs.keys(), &prefix))
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Decorator that bounds every call of the wrapped service.
///
/// An expired call fails with [`AdapterError::Timeout`]; the inner future is
/// dropped.
pub struct TimeoutService<S> {
    inner: S,
    timeout: Duration,
}

impl<S: CloudService> TimeoutService<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        TimeoutService { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T>(&self, call: ServiceFuture<'_, T>) -> AdapterResult<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| AdapterError::Timeout)?
    }
}

impl<S: CloudService> CloudService for TimeoutService<S> {
    fn upload<'a>(&'a self, path: &'a str, payload: Vec<u8>) -> ServiceFuture<'a, ()> {
        Box::pin(self.bounded(self.inner.upload(path, payload)))
    }

    fn download<'a>(&'a self, path: &'a str) -> ServiceFuture<'a, Option<Vec<u8>>> {
        Box::pin(self.bounded(self.inner.download(path)))
    }

    fn delete<'a>(&'a self, path: &'a str) -> ServiceFuture<'a, ()> {
        Box::pin(self.bounded(self.inner.delete(path)))
    }

    fn list<'a>(&'a self, prefix: &'a str) -> ServiceFuture<'a, Vec<String>> {
        Box::pin(self.bounded(self.inner.list(prefix)))
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Which backend a project syncs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Directory,
    Memory,
}

/// The backend a [`CloudConfig`] selects, bounded by its
/// timeout. A relative directory root is taken relative to `work_dir`.
pub fn create_service(
    config: &CloudConfig,
    work_dir: &Path,
) -> TimeoutService<Box<dyn CloudService>> {
    let inner: Box<dyn CloudService> = match config.backend {
        Backend::Directory => {
            let root = if config.root.is_absolute() {
                config.root.clone()
            } else {
                work_dir.join(&config.root)
            };
            Box::new(DirectoryService::new(root))
        }
        Backend::Memory => Box::new(MemoryService::new()),
    };
    TimeoutService::new(inner, Duration::from_secs(config.timeout_secs))
}

/// Prefix the connection check writes under.
pub const CONNECTION_TEST_PREFIX: &str = "test";

const CONNECTION_TEST_PAYLOAD: &[u8] = b"csync connection test";

/// Upload a small blob under [`CONNECTION_TEST_PREFIX`], read it back and
/// delete it. Returns the path used.
///
/// The delete is attempted even when the read back fails.
pub async fn check_connection<S: CloudService + ?Sized>(service: &S) -> AdapterResult<String> {
    let path = format!(
        "{}/{}",
        CONNECTION_TEST_PREFIX,
        Utc::now().format("%Y%m%d%H%M%S%6f")
    );
    service
        .upload(&path, CONNECTION_TEST_PAYLOAD.to_vec())
        .await?;
    let read_back = service.download(&path).await;
    let deleted = service.delete(&path).await;

    match read_back? {
        Some(bytes) if bytes == CONNECTION_TEST_PAYLOAD => {}
        Some(_) => {
            return Err(AdapterError::Backend(format!(
                "{} read back different bytes",
                path
            )))
        }
        None => {
            return Err(AdapterError::Backend(format!(
                "{} missing right after upload",
                path
            )))
        }
    }
    deleted?;
    Ok(path)
}
