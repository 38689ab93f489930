//! Storage manager that dispatches to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use wsi_core::config::storage::StorageConfig;
use wsi_core::error::AppError;
use wsi_core::result::AppResult;
use wsi_core::traits::sharding::ShardingAlgorithm;
use wsi_core::traits::storage::KeyValueStorage;
use wsi_core::types::shard::RedisShard;

/// Storage manager that wraps the configured key-value provider.
///
/// The provider is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct StorageManager {
    /// The inner storage provider.
    inner: Arc<dyn KeyValueStorage>,
}

impl StorageManager {
    /// Create a new storage manager from configuration.
    ///
    /// `sharding` is the algorithm registered for the Redis pool; the
    /// Redis provider opens one client per shard it routes to and fails
    /// if any of them cannot be reached.
    pub async fn new(
        config: &StorageConfig,
        sharding: Arc<dyn ShardingAlgorithm<RedisShard>>,
    ) -> AppResult<Self> {
        Self::build(config, sharding, true).await
    }

    /// Like [`StorageManager::new`], but shards that cannot be reached are
    /// left without a client: they report offline and keys routed to them
    /// fail with a configuration error.
    pub async fn connect_available(
        config: &StorageConfig,
        sharding: Arc<dyn ShardingAlgorithm<RedisShard>>,
    ) -> AppResult<Self> {
        Self::build(config, sharding, false).await
    }

    #[cfg_attr(not(feature = "redis-backend"), allow(unused_variables))]
    async fn build(
        config: &StorageConfig,
        sharding: Arc<dyn ShardingAlgorithm<RedisShard>>,
        require_all: bool,
    ) -> AppResult<Self> {
        let inner: Arc<dyn KeyValueStorage> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                use crate::redis::{RedisKeyValueStorage, RedisShardClients};
                use crate::throttle::ErrorLogThrottle;

                info!(shards = sharding.shards().len(), "Initializing Redis storage provider");
                let throttle = ErrorLogThrottle::new(config.error_log_suppression());
                let clients = if require_all {
                    RedisShardClients::connect_all(sharding.shards(), &config.key_prefix, throttle)
                        .await?
                } else {
                    RedisShardClients::connect_available(
                        sharding.shards(),
                        &config.key_prefix,
                        config.ping_timeout(),
                        throttle,
                    )
                    .await
                };
                if clients.is_empty() {
                    warn!("No Redis shard is connected");
                } else {
                    info!(connected = clients.len(), "Redis storage provider ready");
                }
                Arc::new(RedisKeyValueStorage::new(sharding, clients))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory storage provider");
                Arc::new(crate::memory::MemoryKeyValueStorage::new(
                    sharding,
                    config.memory_capacity,
                ))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown storage provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a storage manager from an existing provider (for testing).
    pub fn from_provider(provider: Arc<dyn KeyValueStorage>) -> Self {
        Self { inner: provider }
    }
}

#[async_trait]
impl KeyValueStorage for StorageManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> AppResult<u64> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.inner.exists(key).await
    }

    async fn get_all_keys(&self, key: &str) -> AppResult<Vec<String>> {
        self.inner.get_all_keys(key).await
    }

    async fn is_node_online(&self, url: &str, timeout: Duration) -> bool {
        self.inner.is_node_online(url, timeout).await
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use wsi_core::error::ErrorKind;

    use super::*;
    use crate::sharding::ConsistentHashSharding;

    fn sharding() -> Arc<dyn ShardingAlgorithm<RedisShard>> {
        Arc::new(ConsistentHashSharding::new(
            RedisShard::pool(["redis://a:6379"]),
            16,
        ))
    }

    #[tokio::test]
    async fn test_memory_provider_selected() {
        let config = StorageConfig {
            provider: "memory".to_string(),
            ..StorageConfig::default()
        };
        let storage = StorageManager::new(&config, sharding()).await.unwrap();
        storage.set("key1", "v").await.unwrap();
        assert_eq!(storage.get("key1").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_provider_rejected() {
        let config = StorageConfig {
            provider: "memcached".to_string(),
            ..StorageConfig::default()
        };
        let err = StorageManager::new(&config, sharding()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[cfg(feature = "redis-backend")]
    #[tokio::test]
    async fn test_connect_available_tolerates_offline_node() {
        let config = StorageConfig {
            provider: "redis".to_string(),
            nodes: vec!["redis://127.0.0.1:1".to_string()],
            ping_timeout_ms: 500,
            ..StorageConfig::default()
        };
        let sharding: Arc<dyn ShardingAlgorithm<RedisShard>> = Arc::new(
            ConsistentHashSharding::new(RedisShard::pool(&config.nodes), 16),
        );

        let storage = StorageManager::connect_available(&config, sharding)
            .await
            .unwrap();
        assert!(
            !storage
                .is_node_online("redis://127.0.0.1:1", Duration::from_millis(500))
                .await
        );
    }
}
