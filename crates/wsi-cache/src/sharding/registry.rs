//! Named lookup of sharding algorithms.

use std::collections::HashMap;
use std::sync::Arc;

use wsi_core::error::AppError;
use wsi_core::result::AppResult;
use wsi_core::traits::sharding::ShardingAlgorithm;
use wsi_core::types::shard::Shard;

/// Registry name of the algorithm routing keys onto Redis nodes.
pub const REDIS_SHARDING_KEY: &str = "REDIS_SHARDING_KEY";

/// Registry name of the algorithm routing resources onto tile servers.
pub const TILE_SERVER_SHARDING_KEY: &str = "TILE_SERVER_SHARDING_KEY";

/// Sharding algorithms for one shard type, registered by name.
#[derive(Debug)]
pub struct ShardingRegistry<S: Shard> {
    algorithms: HashMap<String, Arc<dyn ShardingAlgorithm<S>>>,
}

impl<S: Shard> ShardingRegistry<S> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            algorithms: HashMap::new(),
        }
    }

    /// Register `algorithm` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, algorithm: Arc<dyn ShardingAlgorithm<S>>) {
        self.algorithms.insert(name.into(), algorithm);
    }

    /// Look up an algorithm by name.
    pub fn get(&self, name: &str) -> AppResult<Arc<dyn ShardingAlgorithm<S>>> {
        self.algorithms.get(name).cloned().ok_or_else(|| {
            AppError::configuration(format!("No sharding algorithm registered as '{name}'"))
        })
    }
}

impl<S: Shard> Default for ShardingRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
