//! Dock registry.
//!
//! Maps the dock collection onto the shared store:
//! - an index list (`index_key`) holding every registered dock URL
//! - one hash per dock, keyed by its canonical URL, with the fields
//!   `host`, `numBuilds`, `numContainers` and `tags`
//!
//! Counters are coerced to integers exactly once, when records are read
//! (see [`RawDockRecord::to_valid`]); nothing downstream parses store values.

mod host;
mod record;

pub use host::{DockHost, HostError};
pub use record::{
    CounterField, DockRecord, RawDockRecord, UnknownWorkloadType, WorkloadType, FIELD_HOST,
    FIELD_TAGS,
};

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::store::{KvStore, StoreError};

/// Default index key for the dock list.
pub const DEFAULT_INDEX_KEY: &str = "dockyard:docks";

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid host: {0}")]
    InvalidHost(#[from] HostError),

    #[error("unknown host: {0}")]
    UnknownHost(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Registry of docks in the shared store.
#[derive(Clone)]
pub struct DockRegistry {
    store: Arc<dyn KvStore>,
    index_key: String,
}

impl DockRegistry {
    pub fn new(store: Arc<dyn KvStore>, index_key: impl Into<String>) -> Self {
        Self {
            store,
            index_key: index_key.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Every record referenced by the index, including incomplete ones.
    ///
    /// A URL listed more than once in the index is read once.
    pub async fn list_all_docks(&self) -> RegistryResult<Vec<RawDockRecord>> {
        let mut keys = self.store.list(&self.index_key).await?;
        let mut seen = HashSet::new();
        keys.retain(|key| seen.insert(key.clone()));

        let hashes = self.store.multi_hash_get_all(&keys).await?;
        Ok(keys
            .into_iter()
            .zip(hashes)
            .map(|(key, fields)| RawDockRecord { key, fields })
            .collect())
    }

    /// Records valid for selection, optionally restricted to docks carrying `tag`.
    pub async fn list_valid_docks(&self, tag: Option<&str>) -> RegistryResult<Vec<DockRecord>> {
        let raw = self.list_all_docks().await?;
        let total = raw.len();

        let docks: Vec<DockRecord> = raw
            .iter()
            .filter_map(RawDockRecord::to_valid)
            .filter(|dock| tag.is_none_or(|tag| dock.has_tag(tag)))
            .collect();

        debug!(total, valid = docks.len(), tag = ?tag, "Listed docks");
        Ok(docks)
    }

    /// Register a dock. Re-adding an existing dock keeps its counters.
    ///
    /// When `tags` is given it replaces the stored labels. Counters left behind
    /// by increments against an unregistered dock (a container event arriving
    /// after the dock went down) are reset to zero on first registration.
    /// A dock already in the index stays visible throughout a re-add.
    #[instrument(skip(self), fields(index = %self.index_key))]
    pub async fn add_host(&self, host: &str, tags: Option<&str>) -> RegistryResult<DockHost> {
        let dock = DockHost::parse(host)?;
        let key = dock.as_key();

        let fresh = self.store.hash_set_if_absent(&key, FIELD_HOST, &key).await?;
        for field in CounterField::ALL {
            if fresh {
                self.store.hash_set(&key, field.as_str(), "0").await?;
            } else {
                self.store
                    .hash_set_if_absent(&key, field.as_str(), "0")
                    .await?;
            }
        }
        match tags {
            Some(tags) => self.store.hash_set(&key, FIELD_TAGS, tags).await?,
            None => {
                self.store.hash_set_if_absent(&key, FIELD_TAGS, "").await?;
            }
        }

        let indexed = self.store.list_push_if_absent(&self.index_key, &key).await?;

        info!(host = %key, fresh, indexed, "Dock registered");
        Ok(dock)
    }

    /// Remove a dock and its index entry. Removing an unknown dock succeeds.
    #[instrument(skip(self), fields(index = %self.index_key))]
    pub async fn delete_host(&self, host: &str) -> RegistryResult<DockHost> {
        let dock = DockHost::parse(host)?;
        let key = dock.as_key();

        let removed = self.store.list_remove(&self.index_key, &key).await?;
        self.store.delete(&key).await?;

        info!(host = %key, removed, "Dock removed");
        Ok(dock)
    }

    /// Overwrite a counter on an existing dock.
    #[instrument(skip(self))]
    pub async fn set_field(&self, host: &str, field: CounterField, value: i64) -> RegistryResult<()> {
        let dock = DockHost::parse(host)?;
        let key = dock.as_key();

        let set = self
            .store
            .hash_set_if_exists(&key, field.as_str(), &value.to_string())
            .await?;
        if !set {
            return Err(RegistryError::UnknownHost(key));
        }
        info!(host = %key, field = %field, value, "Dock counter set");
        Ok(())
    }

    /// Atomically add `amount` (possibly negative) to the counter `workload` loads.
    ///
    /// `host` is used verbatim as the record key. Incrementing a dock that is
    /// not registered leaves a counter-only hash with no index entry; it is
    /// never selected and [`add_host`](Self::add_host) zeroes it.
    pub async fn increment_field(
        &self,
        host: &str,
        workload: WorkloadType,
        amount: i64,
    ) -> RegistryResult<i64> {
        let field = workload.counter();
        let value = self
            .store
            .hash_increment_by(host, field.as_str(), amount)
            .await?;
        debug!(host, field = %field, amount, value, "Dock counter incremented");
        Ok(value)
    }
}
