//! Contract with the authoritative tile-server fleet.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::session_data::SessionData;
use crate::types::shard::TileServerShard;

/// Sessions a tile server reports as open: session id -> resource key.
pub type RemoteSessions = HashMap<String, String>;

/// Queries and resets sessions on the tile-server fleet.
///
/// Both calls are networked and may be slow. Implementations do not retry;
/// failures surface to the caller.
#[async_trait]
pub trait RemoteSessionHandler: Send + Sync + std::fmt::Debug + 'static {
    /// Current authoritative session map of `shard`.
    async fn get_sessions(&self, shard: &TileServerShard) -> AppResult<RemoteSessions>;

    /// Ask the fleet to drop the given sessions. Best effort.
    async fn reset_sessions(&self, sessions: &[SessionData]) -> AppResult<()>;
}
