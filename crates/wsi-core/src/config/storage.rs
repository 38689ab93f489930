//! Key-value tier configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sharded key-value storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage provider type: `"redis"` or `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Redis shard endpoints. One long-lived client is opened per entry.
    #[serde(default)]
    pub nodes: Vec<String>,
    /// Key prefix for every session record.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Deadline for a health-check ping in milliseconds.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_ms: u64,
    /// Window during which repeated transport errors for one endpoint are not logged.
    #[serde(default = "default_error_log_suppression")]
    pub error_log_suppression_seconds: u64,
    /// Points per shard on the consistent-hash ring.
    #[serde(default = "default_virtual_nodes")]
    pub virtual_nodes: u32,
    /// Maximum entries per shard for the in-memory provider.
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: u64,
}

impl StorageConfig {
    /// Health-check ping deadline.
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    /// Error-log suppression window.
    pub fn error_log_suppression(&self) -> Duration {
        Duration::from_secs(self.error_log_suppression_seconds)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            nodes: Vec::new(),
            key_prefix: default_key_prefix(),
            ping_timeout_ms: default_ping_timeout(),
            error_log_suppression_seconds: default_error_log_suppression(),
            virtual_nodes: default_virtual_nodes(),
            memory_capacity: default_memory_capacity(),
        }
    }
}

fn default_provider() -> String {
    "redis".to_string()
}

fn default_key_prefix() -> String {
    "wsi:session:".to_string()
}

fn default_ping_timeout() -> u64 {
    2000
}

fn default_error_log_suppression() -> u64 {
    30
}

fn default_virtual_nodes() -> u32 {
    160
}

fn default_memory_capacity() -> u64 {
    10_000
}
