//! Persisted session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shard::TileServerShard;

/// One open viewing session against a tile-serving resource.
///
/// Stored as one JSON object per key in the key-value tier:
///
/// ```json
/// {"sessionId":"…","lastAccessTimestamp":"2024-01-01T00:00:00Z","shard":{"url":"…"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    /// Identifier of the session on the tile server.
    pub session_id: String,
    /// Last time this session was touched; drives expiry.
    pub last_access_timestamp: DateTime<Utc>,
    /// Tile server serving this session's tiles.
    pub shard: TileServerShard,
}

impl SessionData {
    /// Create a record stamped with the current time.
    pub fn new(session_id: impl Into<String>, shard: TileServerShard) -> Self {
        Self {
            session_id: session_id.into(),
            last_access_timestamp: Utc::now(),
            shard,
        }
    }

    /// Refresh the last-access timestamp.
    pub fn touch(&mut self) {
        self.last_access_timestamp = Utc::now();
    }

    /// Whether the session has not been accessed within `stale_after` as of `now`.
    pub fn is_stale(&self, stale_after: std::time::Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(stale_after) {
            Ok(window) => now - self.last_access_timestamp > window,
            // A window too large to represent never elapses.
            Err(_) => false,
        }
    }
}

/// A stored key together with its best-effort parsed session record.
///
/// `session_data` is `None` when the stored value is missing or not a valid
/// [`SessionData`] document.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValueEntry {
    /// Record key (prefix stripped), see [`super::record_key`].
    pub key: String,
    /// Parsed record, if the value could be parsed.
    pub session_data: Option<SessionData>,
}
