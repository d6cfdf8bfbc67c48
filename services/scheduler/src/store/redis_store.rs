//! Redis store backend.

use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, RedisError, Script};
use tracing::info;

use super::{KvStore, StoreError, StoreResult};

/// RPUSH guarded by LPOS so the check and the append are one server-side step.
static PUSH_IF_ABSENT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r#"
        if redis.call('LPOS', KEYS[1], ARGV[1]) then
            return 0
        end
        redis.call('RPUSH', KEYS[1], ARGV[1])
        return 1
        "#,
    )
});

/// HSET on an existing hash only, so a concurrent DEL cannot leave a partial record.
static SET_IF_EXISTS: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r#"
        if redis.call('EXISTS', KEYS[1]) == 0 then
            return 0
        end
        redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
        return 1
        "#,
    )
});

fn at(key: &str) -> impl FnOnce(RedisError) -> StoreError + '_ {
    move |err| StoreError::from_redis(key, err)
}

fn unavailable(err: RedisError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

/// Store backed by a shared Redis instance.
///
/// The multiplexed connection is cheap to clone; each call clones it so the
/// store can be shared behind an `Arc` without a lock.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to the store at `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> StoreResult<Self> {
        info!("Connecting to redis");
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        info!("Redis connection established");
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn list(&self, index_key: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let values: Vec<String> = conn.lrange(index_key, 0, -1).await.map_err(at(index_key))?;
        Ok(values)
    }

    async fn list_push(&self, index_key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.rpush(index_key, value).await.map_err(at(index_key))?;
        Ok(())
    }

    async fn list_push_if_absent(&self, index_key: &str, value: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let pushed: i64 = PUSH_IF_ABSENT
            .key(index_key)
            .arg(value)
            .invoke_async(&mut conn)
            .await
            .map_err(at(index_key))?;
        Ok(pushed == 1)
    }

    async fn list_remove(&self, index_key: &str, value: &str) -> StoreResult<u64> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.lrem(index_key, 0, value).await.map_err(at(index_key))?;
        Ok(removed)
    }

    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let mut conn = self.conn.clone();
        let hash: HashMap<String, String> = conn.hgetall(key).await.map_err(at(key))?;
        Ok(hash)
    }

    async fn multi_hash_get_all(
        &self,
        keys: &[String],
    ) -> StoreResult<Vec<HashMap<String, String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for key in keys {
            pipe.hgetall(key);
        }

        let mut conn = self.conn.clone();
        let hashes: Vec<HashMap<String, String>> = pipe
            .query_async(&mut conn)
            .await
            .map_err(|err| StoreError::from_redis(&keys.join(","), err))?;
        Ok(hashes)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.hset(key, field, value).await.map_err(at(key))?;
        Ok(())
    }

    async fn hash_set_if_absent(&self, key: &str, field: &str, value: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let set: bool = conn.hset_nx(key, field, value).await.map_err(at(key))?;
        Ok(set)
    }

    async fn hash_set_if_exists(&self, key: &str, field: &str, value: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let set: i64 = SET_IF_EXISTS
            .key(key)
            .arg(field)
            .arg(value)
            .invoke_async(&mut conn)
            .await
            .map_err(at(key))?;
        Ok(set == 1)
    }

    async fn hash_increment_by(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.hincr(key, field, delta).await.map_err(at(key))?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await.map_err(at(key))?;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}
