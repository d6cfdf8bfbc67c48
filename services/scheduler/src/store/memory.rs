//! In-process store backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{KvStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct MemoryState {
    lists: HashMap<String, Vec<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
}

/// Store backed by process memory.
///
/// Each operation holds the lock for its whole duration, which gives the same
/// per-command atomicity the shared store provides.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the store going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn list(&self, index_key: &str) -> StoreResult<Vec<String>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.lists.get(index_key).cloned().unwrap_or_default())
    }

    async fn list_push(&self, index_key: &str, value: &str) -> StoreResult<()> {
        self.check_available()?;
        let mut state = self.state.write().await;
        state
            .lists
            .entry(index_key.to_string())
            .or_default()
            .push(value.to_string());
        Ok(())
    }

    async fn list_push_if_absent(&self, index_key: &str, value: &str) -> StoreResult<bool> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let list = state.lists.entry(index_key.to_string()).or_default();
        if list.iter().any(|v| v == value) {
            return Ok(false);
        }
        list.push(value.to_string());
        Ok(true)
    }

    async fn list_remove(&self, index_key: &str, value: &str) -> StoreResult<u64> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let Some(list) = state.lists.get_mut(index_key) else {
            return Ok(0);
        };
        let before = list.len();
        list.retain(|v| v != value);
        let removed = (before - list.len()) as u64;
        if list.is_empty() {
            state.lists.remove(index_key);
        }
        Ok(removed)
    }

    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn multi_hash_get_all(
        &self,
        keys: &[String],
    ) -> StoreResult<Vec<HashMap<String, String>>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(keys
            .iter()
            .map(|key| state.hashes.get(key).cloned().unwrap_or_default())
            .collect())
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        self.check_available()?;
        let mut state = self.state.write().await;
        state
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_set_if_absent(&self, key: &str, field: &str, value: &str) -> StoreResult<bool> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let hash = state.hashes.entry(key.to_string()).or_default();
        if hash.contains_key(field) {
            return Ok(false);
        }
        hash.insert(field.to_string(), value.to_string());
        Ok(true)
    }

    async fn hash_set_if_exists(&self, key: &str, field: &str, value: &str) -> StoreResult<bool> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let Some(hash) = state.hashes.get_mut(key) else {
            return Ok(false);
        };
        hash.insert(field.to_string(), value.to_string());
        Ok(true)
    }

    async fn hash_increment_by(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let hash = state.hashes.entry(key.to_string()).or_default();
        let current = match hash.get(field) {
            Some(raw) => raw.parse::<i64>().map_err(|_| StoreError::Corrupt {
                key: key.to_string(),
                message: format!("field '{field}' is not an integer"),
            })?,
            None => 0,
        };
        let updated = current + delta;
        hash.insert(field.to_string(), updated.to_string());
        Ok(updated)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.check_available()?;
        let mut state = self.state.write().await;
        state.lists.remove(key);
        state.hashes.remove(key);
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_available()
    }
}
