//! Sharding algorithm trait.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::shard::Shard;

/// Maps a string key onto one shard of a fixed pool.
///
/// Implementations must be pure functions of the key and the (immutable)
/// pool: the same key always yields the same shard while the pool is
/// unchanged. An empty pool fails with
/// [`ErrorKind::NoShardsAvailable`](crate::error::ErrorKind::NoShardsAvailable).
#[async_trait]
pub trait ShardingAlgorithm<S: Shard>: Send + Sync + std::fmt::Debug + 'static {
    /// Resolve the shard responsible for `key`.
    async fn get_shard(&self, key: &str) -> AppResult<S>;

    /// The pool this algorithm routes over.
    fn shards(&self) -> &[S];
}
