//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use wsi_cache::memory::MemoryKeyValueStorage;
use wsi_cache::provider::StorageManager;
use wsi_cache::sharding::ConsistentHashSharding;
use wsi_core::config::session::SessionConfig;
use wsi_core::traits::storage::KeyValueStorage;
use wsi_core::types::record_key::record_key;
use wsi_core::types::session_data::SessionData;
use wsi_core::types::shard::{RedisShard, TileServerShard};
use wsi_session::{InMemoryRemoteSessionHandler, SessionManager};

/// Staleness window used by the admission scenarios.
pub const STALE_AFTER: Duration = Duration::from_secs(1);

/// Test application context: a manager over one in-memory storage shard
/// and one in-memory tile server.
pub struct TestApp {
    /// Manager under test
    pub manager: SessionManager,
    /// Storage the manager writes to, for direct inspection
    pub storage: Arc<StorageManager>,
    /// Authoritative tile-server view
    pub fleet: Arc<InMemoryRemoteSessionHandler>,
    /// The only tile server
    pub tiles: TileServerShard,
}

impl TestApp {
    /// Create a fresh application with empty storage and fleet.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Create a fresh application with the given session settings.
    pub fn with_config(config: SessionConfig) -> Self {
        Self::build(&["redis://test:6379"], config)
    }

    /// Create a fresh application whose records spread over several
    /// storage nodes.
    pub fn with_storage_nodes(nodes: &[&str]) -> Self {
        Self::build(nodes, SessionConfig::default())
    }

    fn build(nodes: &[&str], config: SessionConfig) -> Self {
        let redis = Arc::new(ConsistentHashSharding::new(
            RedisShard::pool(nodes.iter().copied()),
            32,
        ));
        let storage = Arc::new(StorageManager::from_provider(Arc::new(
            MemoryKeyValueStorage::new(redis, 1000),
        )));

        let tiles = TileServerShard::new("http://tiles-test:5000");
        let sharding = Arc::new(ConsistentHashSharding::new(vec![tiles.clone()], 32));
        let fleet = Arc::new(InMemoryRemoteSessionHandler::new());

        let manager = SessionManager::new(storage.clone(), sharding, fleet.clone(), config);

        Self {
            manager,
            storage,
            fleet,
            tiles,
        }
    }

    /// Record a session both on the tile server and in storage, last
    /// accessed `age` ago.
    pub async fn seed_session(&self, session_id: &str, key: &str, age: chrono::Duration) {
        self.fleet.open_session(&self.tiles, session_id, key).await;

        let mut data = SessionData::new(session_id, self.tiles.clone());
        data.last_access_timestamp = Utc::now() - age;
        self.storage
            .set(
                &self.record(key),
                &serde_json::to_string(&data).expect("serialize session"),
            )
            .await
            .expect("seed session record");
    }

    /// Storage key of `key`'s session record.
    pub fn record(&self, key: &str) -> String {
        record_key(&self.tiles, key)
    }

    /// Record a session accessed just now.
    pub async fn seed_live_session(&self, session_id: &str, key: &str) {
        self.seed_session(session_id, key, chrono::Duration::zero())
            .await;
    }
}
