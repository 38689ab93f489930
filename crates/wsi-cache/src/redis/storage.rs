//! Redis implementation of [`KeyValueStorage`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use wsi_core::result::AppResult;
use wsi_core::traits::sharding::ShardingAlgorithm;
use wsi_core::traits::storage::KeyValueStorage;
use wsi_core::types::record_key::routing_key;
use wsi_core::types::shard::{RedisShard, Shard};

use super::client::RedisClientHolder;
use super::pool::RedisShardClients;

/// Keys fetched per `SCAN` round trip.
const SCAN_BATCH: usize = 200;

/// Keys of `batch` that carry `prefix`, with the prefix stripped.
fn unprefixed<'a>(prefix: &'a str, batch: &'a [String]) -> impl Iterator<Item = String> + 'a {
    batch
        .iter()
        .filter_map(move |full| full.strip_prefix(prefix))
        .map(str::to_string)
}

/// Redis-backed storage sharded over a fixed pool of nodes.
#[derive(Debug, Clone)]
pub struct RedisKeyValueStorage {
    /// Routes keys onto Redis shards.
    sharding: Arc<dyn ShardingAlgorithm<RedisShard>>,
    /// One client per shard.
    clients: RedisShardClients,
}

impl RedisKeyValueStorage {
    /// Create a storage over connected shard clients.
    pub fn new(sharding: Arc<dyn ShardingAlgorithm<RedisShard>>, clients: RedisShardClients) -> Self {
        Self { sharding, clients }
    }

    /// Resolve the client holding `key`.
    async fn holder_for(&self, key: &str) -> AppResult<&RedisClientHolder> {
        let shard = self.sharding.get_shard(routing_key(key)).await?;
        self.clients.client_for(&shard)
    }
}

#[async_trait]
impl KeyValueStorage for RedisKeyValueStorage {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let holder = self.holder_for(key).await?;
        let mut conn = holder.conn_mut();
        let value: Option<String> = conn
            .get(holder.prefixed_key(key))
            .await
            .map_err(|e| self.clients.transport_error(holder.shard().url(), e))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let holder = self.holder_for(key).await?;
        let mut conn = holder.conn_mut();
        let _: () = conn
            .set(holder.prefixed_key(key), value)
            .await
            .map_err(|e| self.clients.transport_error(holder.shard().url(), e))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<u64> {
        let holder = self.holder_for(key).await?;
        let mut conn = holder.conn_mut();
        let removed: u64 = conn
            .del(holder.prefixed_key(key))
            .await
            .map_err(|e| self.clients.transport_error(holder.shard().url(), e))?;
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let holder = self.holder_for(key).await?;
        let mut conn = holder.conn_mut();
        let found: bool = conn
            .exists(holder.prefixed_key(key))
            .await
            .map_err(|e| self.clients.transport_error(holder.shard().url(), e))?;
        Ok(found)
    }

    async fn get_all_keys(&self, key: &str) -> AppResult<Vec<String>> {
        let holder = self.holder_for(key).await?;
        let mut conn = holder.conn_mut();
        let pattern = holder.prefixed_key("*");

        // Cursor-based SCAN instead of KEYS so a large shard is not blocked.
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| self.clients.transport_error(holder.shard().url(), e))?;

            keys.extend(unprefixed(holder.key_prefix(), &batch));

            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once.
        keys.sort();
        keys.dedup();

        debug!(shard = %holder.shard(), count = keys.len(), "Listed shard keys");
        Ok(keys)
    }

    async fn is_node_online(&self, url: &str, timeout: Duration) -> bool {
        let Some(holder) = self.clients.by_url(url) else {
            debug!(url, "Health check for unknown Redis node");
            return false;
        };

        let mut conn = holder.conn_mut();
        let ping = async {
            let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>(pong)
        };

        match tokio::time::timeout(timeout, ping).await {
            Ok(Ok(pong)) => pong == "PONG",
            Ok(Err(e)) => {
                let _ = self.clients.transport_error(url, e);
                false
            }
            Err(_) => {
                debug!(shard = %holder.shard(), ?timeout, "Redis ping timed out");
                false
            }
        }
    }
}
