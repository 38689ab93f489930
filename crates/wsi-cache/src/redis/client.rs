//! Redis connection ownership for one shard.

use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use wsi_core::error::{AppError, ErrorKind};
use wsi_core::result::AppResult;
use wsi_core::types::shard::{RedisShard, Shard};

/// Owns the long-lived connection to one Redis shard.
///
/// Decouples the storage layer from the client library: storage code asks
/// for a connection handle and a key prefix, nothing else.
#[derive(Debug, Clone)]
pub struct RedisClientHolder {
    /// Shard this holder connects to.
    shard: RedisShard,
    /// Redis connection manager (multiplexed, reconnecting).
    conn: ConnectionManager,
    /// Key prefix for all keys.
    key_prefix: String,
}

impl RedisClientHolder {
    /// Open the connection to `shard`.
    pub async fn connect(shard: RedisShard, key_prefix: &str) -> AppResult<Self> {
        info!(url = %mask_redis_url(shard.url()), "Connecting to Redis shard");

        let client = Client::open(shard.url()).map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Failed to create Redis client", e)
        })?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Cache,
                format!("Failed to connect to Redis shard {}", mask_redis_url(shard.url())),
                e,
            )
        })?;

        info!(url = %mask_redis_url(shard.url()), "Connected to Redis shard");
        Ok(Self {
            shard,
            conn,
            key_prefix: key_prefix.to_string(),
        })
    }

    /// The shard this holder serves.
    pub fn shard(&self) -> &RedisShard {
        &self.shard
    }

    /// Get a mutable clone of the connection manager.
    pub fn conn_mut(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Build a full key with the configured prefix.
    pub fn prefixed_key(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }

    /// The configured key prefix.
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }
}

/// Mask password in Redis URL for safe logging.
pub fn mask_redis_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
            if colon_pos > scheme_end {
                return format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}
