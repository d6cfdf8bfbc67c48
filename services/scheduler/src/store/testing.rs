//! Store wrappers for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{KvStore, MemoryStore, StoreResult};

/// A [`MemoryStore`] that records what other components do to it.
///
/// After every mutation it notes the length of `watched_index`, and it keeps
/// the keys passed to [`KvStore::hash_increment_by`] in call order.
pub(crate) struct RecordingStore {
    inner: MemoryStore,
    watched_index: String,
    index_lengths: Mutex<Vec<usize>>,
    increments: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub(crate) fn new(watched_index: &str) -> Self {
        Self {
            inner: MemoryStore::new(),
            watched_index: watched_index.to_string(),
            index_lengths: Mutex::new(Vec::new()),
            increments: Mutex::new(Vec::new()),
        }
    }

    /// Index lengths observed since the last call.
    pub(crate) fn take_index_lengths(&self) -> Vec<usize> {
        std::mem::take(&mut *self.index_lengths.lock().unwrap())
    }

    pub(crate) fn increments(&self) -> Vec<String> {
        self.increments.lock().unwrap().clone()
    }

    async fn observe(&self) {
        let len = self.inner.list(&self.watched_index).await.unwrap().len();
        self.index_lengths.lock().unwrap().push(len);
    }
}

#[async_trait]
impl KvStore for RecordingStore {
    async fn list(&self, index_key: &str) -> StoreResult<Vec<String>> {
        self.inner.list(index_key).await
    }

    async fn list_push(&self, index_key: &str, value: &str) -> StoreResult<()> {
        let result = self.inner.list_push(index_key, value).await;
        self.observe().await;
        result
    }

    async fn list_push_if_absent(&self, index_key: &str, value: &str) -> StoreResult<bool> {
        let result = self.inner.list_push_if_absent(index_key, value).await;
        self.observe().await;
        result
    }

    async fn list_remove(&self, index_key: &str, value: &str) -> StoreResult<u64> {
        let result = self.inner.list_remove(index_key, value).await;
        self.observe().await;
        result
    }

    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        self.inner.hash_get_all(key).await
    }

    async fn multi_hash_get_all(
        &self,
        keys: &[String],
    ) -> StoreResult<Vec<HashMap<String, String>>> {
        self.inner.multi_hash_get_all(keys).await
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let result = self.inner.hash_set(key, field, value).await;
        self.observe().await;
        result
    }

    async fn hash_set_if_absent(&self, key: &str, field: &str, value: &str) -> StoreResult<bool> {
        let result = self.inner.hash_set_if_absent(key, field, value).await;
        self.observe().await;
        result
    }

    async fn hash_set_if_exists(&self, key: &str, field: &str, value: &str) -> StoreResult<bool> {
        let result = self.inner.hash_set_if_exists(key, field, value).await;
        self.observe().await;
        result
    }

    async fn hash_increment_by(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        self.increments.lock().unwrap().push(key.to_string());
        let result = self.inner.hash_increment_by(key, field, delta).await;
        self.observe().await;
        result
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let result = self.inner.delete(key).await;
        self.observe().await;
        result
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}
