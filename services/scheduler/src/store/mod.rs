//! Shared key-value store layer.
//!
//! The dock registry lives in an external store shared by every scheduler
//! instance. This module provides:
//! - The [`KvStore`] trait: the list/hash primitives the registry needs
//! - [`RedisStore`]: the production backend
//! - [`MemoryStore`]: an in-process backend for dev mode and tests
//!
//! Every mutation is a single store-level operation. Counter updates go
//! through [`KvStore::hash_increment_by`] so concurrent writers never lose
//! increments, and conditional writes ([`KvStore::list_push_if_absent`],
//! [`KvStore::hash_set_if_exists`]) check and write in the same step.

mod error;
mod memory;
mod redis_store;
#[cfg(test)]
pub(crate) mod testing;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use std::collections::HashMap;

use async_trait::async_trait;

/// Primitive operations over the shared store.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Read every element of a list.
    async fn list(&self, index_key: &str) -> StoreResult<Vec<String>>;

    /// Append a value to a list.
    async fn list_push(&self, index_key: &str, value: &str) -> StoreResult<()>;

    /// Append a value unless the list already holds it. Returns whether it was appended.
    async fn list_push_if_absent(&self, index_key: &str, value: &str) -> StoreResult<bool>;

    /// Remove every occurrence of `value` from a list. Returns the number removed.
    async fn list_remove(&self, index_key: &str, value: &str) -> StoreResult<u64>;

    /// Read all fields of a hash. A missing key yields an empty map.
    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>>;

    /// Read several hashes in one round trip, in the order of `keys`.
    async fn multi_hash_get_all(&self, keys: &[String])
        -> StoreResult<Vec<HashMap<String, String>>>;

    /// Set one hash field.
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()>;

    /// Set one hash field only if it does not exist yet. Returns whether it was set.
    async fn hash_set_if_absent(&self, key: &str, field: &str, value: &str) -> StoreResult<bool>;

    /// Set one hash field only if the hash exists. Returns whether it was set.
    async fn hash_set_if_exists(&self, key: &str, field: &str, value: &str) -> StoreResult<bool>;

    /// Atomically add `delta` to an integer hash field. Returns the new value.
    async fn hash_increment_by(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64>;

    /// Delete a key of any type.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Round trip to check connectivity.
    async fn ping(&self) -> StoreResult<()>;
}
