//! Tile-server fleet configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tile-server shard pool and session-reporting endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileServerConfig {
    /// Tile-server base URLs.
    #[serde(default)]
    pub nodes: Vec<String>,
    /// Path (relative to a node URL) that reports the node's open sessions.
    #[serde(default = "default_sessions_path")]
    pub sessions_path: String,
    /// Path (relative to a node URL) that drops the given sessions.
    #[serde(default = "default_reset_path")]
    pub reset_path: String,
    /// Per-request timeout for calls to a tile server in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

impl TileServerConfig {
    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for TileServerConfig {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            sessions_path: default_sessions_path(),
            reset_path: default_reset_path(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

fn default_sessions_path() -> String {
    "/sessions".to_string()
}

fn default_reset_path() -> String {
    "/sessions/reset".to_string()
}

fn default_request_timeout() -> u64 {
    5000
}
