//! One client holder per configured Redis shard.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use wsi_core::error::{AppError, ErrorKind};
use wsi_core::result::AppResult;
use wsi_core::types::shard::{RedisShard, Shard};

use super::client::{RedisClientHolder, mask_redis_url};
use crate::throttle::ErrorLogThrottle;

/// Process-wide map of shard URL to live client.
///
/// Built once at startup and read-only afterwards; the only mutable state is
/// the error-log throttle.
#[derive(Debug, Clone)]
pub struct RedisShardClients {
    clients: Arc<HashMap<String, RedisClientHolder>>,
    throttle: Arc<ErrorLogThrottle>,
}

impl RedisShardClients {
    /// Connect to every shard in `pool`.
    pub async fn connect_all(
        pool: &[RedisShard],
        key_prefix: &str,
        throttle: ErrorLogThrottle,
    ) -> AppResult<Self> {
        let mut clients = HashMap::with_capacity(pool.len());
        for shard in pool {
            let holder = RedisClientHolder::connect(shard.clone(), key_prefix).await?;
            clients.insert(shard.url().to_string(), holder);
        }
        info!(shards = clients.len(), "Redis shard clients ready");

        Ok(Self {
            clients: Arc::new(clients),
            throttle: Arc::new(throttle),
        })
    }

    /// Connect to every shard in `pool` that answers within `connect_timeout`,
    /// skipping the rest.
    ///
    /// Used by health checks, which must report offline nodes instead of
    /// failing to start.
    pub async fn connect_available(
        pool: &[RedisShard],
        key_prefix: &str,
        connect_timeout: Duration,
        throttle: ErrorLogThrottle,
    ) -> Self {
        let mut clients = HashMap::with_capacity(pool.len());
        for shard in pool {
            let masked = mask_redis_url(shard.url());
            let connect = RedisClientHolder::connect(shard.clone(), key_prefix);
            match tokio::time::timeout(connect_timeout, connect).await {
                Ok(Ok(holder)) => {
                    clients.insert(shard.url().to_string(), holder);
                }
                Ok(Err(e)) => warn!(url = %masked, error = %e, "Skipping unreachable Redis shard"),
                Err(_) => warn!(url = %masked, ?connect_timeout, "Timed out connecting to Redis shard"),
            }
        }
        info!(
            connected = clients.len(),
            configured = pool.len(),
            "Redis shard clients ready"
        );

        Self {
            clients: Arc::new(clients),
            throttle: Arc::new(throttle),
        }
    }

    /// Client for a resolved shard. Missing clients are a configuration error.
    pub fn client_for(&self, shard: &RedisShard) -> AppResult<&RedisClientHolder> {
        self.clients.get(shard.url()).ok_or_else(|| {
            AppError::configuration(format!(
                "No Redis client configured for shard {}",
                mask_redis_url(shard.url())
            ))
        })
    }

    /// Client by endpoint URL, if configured.
    pub fn by_url(&self, url: &str) -> Option<&RedisClientHolder> {
        self.clients.get(url)
    }

    /// Number of connected shards.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no shard is connected.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Convert a transport error into an [`AppError`], logging it unless the
    /// endpoint is inside its suppression window.
    pub fn transport_error(&self, url: &str, e: redis::RedisError) -> AppError {
        let masked = mask_redis_url(url);
        if self.throttle.should_log(url) {
            warn!(url = %masked, error = %e, "Redis shard error");
        }
        AppError::with_source(ErrorKind::Cache, format!("Redis error on {masked}: {e}"), e)
    }
}
