//! # wsi-cache
//!
//! Sharded key-value storage for session records. Supports two providers:
//!
//! - **redis**: one long-lived [redis](https://crates.io/crates/redis)
//!   connection per configured node, keys routed by consistent hashing
//! - **memory**: in-process [moka](https://crates.io/crates/moka) caches,
//!   one per shard, routed the same way (tests and single-node runs)
//!
//! The provider is selected at runtime based on configuration.

#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;
pub mod sharding;
pub mod throttle;

pub use provider::StorageManager;
pub use sharding::{ConsistentHashSharding, ShardingRegistry};
pub use throttle::ErrorLogThrottle;
