//! In-memory tile-server fleet.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use wsi_core::error::AppError;
use wsi_core::result::AppResult;
use wsi_core::traits::remote::{RemoteSessionHandler, RemoteSessions};
use wsi_core::types::session_data::SessionData;
use wsi_core::types::shard::{Shard, TileServerShard};

/// Holds each tile server's open sessions in process.
///
/// Stands in for the fleet in tests and local runs. Can be switched to
/// unreachable to exercise failure propagation.
#[derive(Debug, Default)]
pub struct InMemoryRemoteSessionHandler {
    /// Shard URL -> open sessions on that shard.
    sessions: RwLock<HashMap<String, RemoteSessions>>,
    /// When set, every call fails as if the fleet were down.
    unreachable: AtomicBool,
}

impl InMemoryRemoteSessionHandler {
    /// Create an empty fleet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an open session on `shard`.
    pub async fn open_session(&self, shard: &TileServerShard, session_id: &str, key: &str) {
        self.sessions
            .write()
            .await
            .entry(shard.url().to_string())
            .or_default()
            .insert(session_id.to_string(), key.to_string());
    }

    /// Remove a session from `shard`.
    pub async fn close_session(&self, shard: &TileServerShard, session_id: &str) {
        if let Some(open) = self.sessions.write().await.get_mut(shard.url()) {
            open.remove(session_id);
        }
    }

    /// Sessions currently open on `shard`.
    pub async fn sessions_on(&self, shard: &TileServerShard) -> RemoteSessions {
        self.sessions
            .read()
            .await
            .get(shard.url())
            .cloned()
            .unwrap_or_default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> AppResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(AppError::external_service("Tile-server fleet unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteSessionHandler for InMemoryRemoteSessionHandler {
    async fn get_sessions(&self, shard: &TileServerShard) -> AppResult<RemoteSessions> {
        self.check_reachable()?;
        Ok(self.sessions_on(shard).await)
    }

    async fn reset_sessions(&self, sessions: &[SessionData]) -> AppResult<()> {
        self.check_reachable()?;
        let mut open = self.sessions.write().await;
        for data in sessions {
            if let Some(on_shard) = open.get_mut(data.shard.url()) {
                on_shard.remove(&data.session_id);
            }
        }
        info!(count = sessions.len(), "Reset in-memory sessions");
        Ok(())
    }
}
