//! Consistent-hash ring over an immutable shard pool.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use wsi_core::error::AppError;
use wsi_core::result::AppResult;
use wsi_core::traits::sharding::ShardingAlgorithm;
use wsi_core::types::shard::Shard;

/// Consistent-hash sharding with virtual nodes.
///
/// Ring points are derived from SHA-256, so placement is identical across
/// processes and restarts. The pool is fixed at construction.
#[derive(Debug, Clone)]
pub struct ConsistentHashSharding<S: Shard> {
    /// Shard pool, deduplicated by URL.
    shards: Vec<S>,
    /// Ring position -> index into `shards`.
    ring: BTreeMap<u64, usize>,
}

impl<S: Shard> ConsistentHashSharding<S> {
    /// Build a ring placing `virtual_nodes` points per shard.
    pub fn new(pool: Vec<S>, virtual_nodes: u32) -> Self {
        let mut shards: Vec<S> = Vec::with_capacity(pool.len());
        for shard in pool {
            if !shards.iter().any(|s| s.url() == shard.url()) {
                shards.push(shard);
            }
        }

        let mut ring = BTreeMap::new();
        for (index, shard) in shards.iter().enumerate() {
            for replica in 0..virtual_nodes.max(1) {
                ring.insert(hash(&format!("{}#{replica}", shard.url())), index);
            }
        }

        Self { shards, ring }
    }

    /// Resolve synchronously.
    pub fn locate(&self, key: &str) -> AppResult<&S> {
        let point = hash(key);
        self.ring
            .range(point..)
            .next()
            .or_else(|| self.ring.iter().next())
            .map(|(_, &index)| &self.shards[index])
            .ok_or_else(|| AppError::no_shards(format!("No shards available for key '{key}'")))
    }
}

#[async_trait]
impl<S: Shard> ShardingAlgorithm<S> for ConsistentHashSharding<S> {
    async fn get_shard(&self, key: &str) -> AppResult<S> {
        self.locate(key).cloned()
    }

    fn shards(&self) -> &[S] {
        &self.shards
    }
}

/// First 8 bytes of the SHA-256 digest, big-endian.
fn hash(input: &str) -> u64 {
    let digest = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}
