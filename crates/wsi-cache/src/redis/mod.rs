//! Redis-backed sharded storage.

pub mod client;
pub mod pool;
pub mod storage;

pub use client::RedisClientHolder;
pub use pool::RedisShardClients;
pub use storage::RedisKeyValueStorage;
