//! In-memory storage implementation using the moka crate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use wsi_core::error::AppError;
use wsi_core::result::AppResult;
use wsi_core::traits::sharding::ShardingAlgorithm;
use wsi_core::traits::storage::KeyValueStorage;
use wsi_core::types::record_key::routing_key;
use wsi_core::types::shard::{RedisShard, Shard};

/// In-memory storage with one moka cache per shard.
///
/// Keys are routed by the same sharding algorithm as the Redis provider, so
/// per-shard listing behaves identically. Entries never expire on their
/// own; expiry is the session manager's decision.
#[derive(Debug, Clone)]
pub struct MemoryKeyValueStorage {
    /// Routes keys onto shards.
    sharding: Arc<dyn ShardingAlgorithm<RedisShard>>,
    /// Shard URL -> that shard's entries.
    shards: Arc<HashMap<String, Cache<String, String>>>,
}

impl MemoryKeyValueStorage {
    /// Create a store with one cache for every shard the algorithm routes to.
    pub fn new(sharding: Arc<dyn ShardingAlgorithm<RedisShard>>, max_capacity: u64) -> Self {
        let nodes = sharding.shards().to_vec();
        Self::with_nodes(sharding, &nodes, max_capacity)
    }

    /// Create a store backing only `nodes`. Keys routed to any other shard
    /// fail with a configuration error.
    pub fn with_nodes(
        sharding: Arc<dyn ShardingAlgorithm<RedisShard>>,
        nodes: &[RedisShard],
        max_capacity: u64,
    ) -> Self {
        let shards: HashMap<String, Cache<String, String>> = nodes
            .iter()
            .map(|shard| {
                let cache = Cache::builder().max_capacity(max_capacity).build();
                (shard.url().to_string(), cache)
            })
            .collect();

        Self {
            sharding,
            shards: Arc::new(shards),
        }
    }

    /// Resolve the cache holding `key`.
    async fn cache_for(&self, key: &str) -> AppResult<&Cache<String, String>> {
        let shard = self.sharding.get_shard(routing_key(key)).await?;
        self.shards.get(shard.url()).ok_or_else(|| {
            AppError::configuration(format!("No storage configured for shard {shard}"))
        })
    }
}

#[async_trait]
impl KeyValueStorage for MemoryKeyValueStorage {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.cache_for(key).await?.get(key).await)
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.cache_for(key)
            .await?
            .insert(key.to_string(), value.to_string())
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<u64> {
        let removed = self.cache_for(key).await?.remove(key).await;
        Ok(u64::from(removed.is_some()))
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.cache_for(key).await?.contains_key(key))
    }

    async fn get_all_keys(&self, key: &str) -> AppResult<Vec<String>> {
        let cache = self.cache_for(key).await?;
        let mut keys: Vec<String> = cache.iter().map(|(k, _)| k.as_ref().clone()).collect();
        keys.sort();
        debug!(count = keys.len(), "Listed shard keys");
        Ok(keys)
    }

    async fn is_node_online(&self, url: &str, _timeout: Duration) -> bool {
        self.shards.contains_key(url)
    }
}
