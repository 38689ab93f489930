//! Session admission configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Admission control and expiry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum concurrent sessions tracked per tile-server shard.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u32,
    /// A session whose last access is older than this many seconds may be evicted.
    #[serde(default = "default_stale_after")]
    pub stale_after_seconds: u64,
    /// Overall deadline for one sync/admission call in milliseconds.
    #[serde(default = "default_sync_timeout")]
    pub sync_timeout_ms: u64,
    /// Whether evicted sessions are also dropped on the tile server.
    #[serde(default = "default_true")]
    pub reset_remote_on_evict: bool,
}

impl SessionConfig {
    /// Staleness window.
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_seconds)
    }

    /// Overall sync deadline.
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            stale_after_seconds: default_stale_after(),
            sync_timeout_ms: default_sync_timeout(),
            reset_remote_on_evict: true,
        }
    }
}

fn default_max_sessions() -> u32 {
    1
}

fn default_stale_after() -> u64 {
    // 15 minutes
    900
}

fn default_sync_timeout() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}
