// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Key-value storage used for sync configuration, the offline queue and the
//! per-category local data.
//!
//! Every `set` replaces the whole value atomically. Read-modify-write goes
//! through [`KeyValueStore::update`], which no other writer can interleave
//! with.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Error, Result};

/// Byte-oriented key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Replace the value under `key` with `f(current)` as one atomic step.
    ///
    /// No other writer sharing the store, in this process or another one on
    /// the same file, can change `key` between the read and the write. If `f`
    /// fails nothing is written.
    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<Vec<u8>>) -> Result<Vec<u8>>,
    ) -> Result<()>;

    /// Read and decode a JSON value.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>
    where
        Self: Sized,
    {
        match self.get(key)? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| Error::CorruptedData {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Encode and store a JSON value.
    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()>
    where
        Self: Sized,
    {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, &bytes)
    }

    /// Atomic read-modify-write of a JSON value. A missing key starts from
    /// `T::default()`. Returns whatever `f` returns.
    fn update_json<T, R, F>(&self, key: &str, f: F) -> Result<R>
    where
        Self: Sized,
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T) -> R,
    {
        let mut f = Some(f);
        let mut output = None;
        self.update(key, &mut |current| {
            let mut value: T = match current {
                None => T::default(),
                Some(bytes) => {
                    serde_json::from_slice(&bytes).map_err(|e| Error::CorruptedData {
                        key: key.to_string(),
                        reason: e.to_string(),
                    })?
                }
            };
            if let Some(f) = f.take() {
                output = Some(f(&mut value));
            }
            Ok(serde_json::to_vec(&value)?)
        })?;
        output.ok_or_else(|| Error::StorageUnavailable(format!("update of '{}' did not run", key)))
    }
}

/// In-memory store, used for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently stored, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let entries = self.lock()?;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| Error::StorageUnavailable("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<Vec<u8>>) -> Result<Vec<u8>>,
    ) -> Result<()> {
        let mut entries = self.lock()?;
        let value = f(entries.get(key).cloned())?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
#[path = "kv_tests.rs"]
mod tests;
