//! Key-to-shard routing.

pub mod registry;
pub mod ring;

pub use registry::{REDIS_SHARDING_KEY, ShardingRegistry, TILE_SERVER_SHARDING_KEY};
pub use ring::ConsistentHashSharding;
