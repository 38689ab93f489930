//! Session admission manager.
//!
//! Keeps the cached session records of each tile server in line with what
//! the tile server itself reports, evicts sessions that have not been
//! accessed within the staleness window, and decides whether a new session
//! fits under the per-server cap.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use wsi_core::config::session::SessionConfig;
use wsi_core::error::AppError;
use wsi_core::result::AppResult;
use wsi_core::traits::remote::RemoteSessionHandler;
use wsi_core::traits::sharding::ShardingAlgorithm;
use wsi_core::traits::storage::KeyValueStorage;
use wsi_core::types::record_key::{record_key, resource_key_of};
use wsi_core::types::session_data::SessionData;
use wsi_core::types::shard::{Shard, TileServerShard};

use crate::admission::AdmissionResult;

/// Orchestrates session admission across the tile-server fleet.
///
/// One instance is built by the process composition root and shared behind
/// an `Arc`. Tests construct a fresh instance per case.
#[derive(Clone)]
pub struct SessionManager {
    /// Sharded session records.
    storage: Arc<dyn KeyValueStorage>,
    /// Routes resource keys onto tile servers.
    sharding: Arc<dyn ShardingAlgorithm<TileServerShard>>,
    /// Authoritative view of the tile servers.
    remote: Arc<dyn RemoteSessionHandler>,
    /// Session configuration.
    config: SessionConfig,
    /// Tile-shard URL -> lock serializing admission checks in this process.
    admission_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("storage", &self.storage)
            .field("tile_servers", &self.sharding.shards().len())
            .field("config", &self.config)
            .finish()
    }
}

impl SessionManager {
    /// Creates a new session manager with all required dependencies.
    pub fn new(
        storage: Arc<dyn KeyValueStorage>,
        sharding: Arc<dyn ShardingAlgorithm<TileServerShard>>,
        remote: Arc<dyn RemoteSessionHandler>,
        config: SessionConfig,
    ) -> Self {
        Self {
            storage,
            sharding,
            remote,
            config,
            admission_locks: Arc::new(DashMap::new()),
        }
    }

    /// Session configuration in effect.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Reconciles local records with the tile server serving `resource_key`,
    /// evicts stale sessions if that makes room, and reports whether one
    /// more session fits under `max_sessions`.
    ///
    /// 1. Resolve the tile server for `resource_key`
    /// 2. Fetch its authoritative session map
    /// 3. Reconcile local records with it
    /// 4. Recount
    /// 5. Evict the oldest stale sessions when that brings the count to the
    ///    cap or below
    /// 6. Return whether there is room
    ///
    /// Fails, rather than assuming zero sessions, when the tile server cannot
    /// be reached. The whole call is bounded by `session.sync_timeout_ms`.
    pub async fn sync_and_invalidate_sessions(
        &self,
        resource_key: &str,
        max_sessions: u32,
        stale_after: Duration,
    ) -> AppResult<bool> {
        self.with_deadline(resource_key, async {
            let shard = self.sharding.get_shard(resource_key).await?;
            let lock = self.lock_for(&shard);
            let _guard = lock.lock().await;
            self.reconcile_and_evict(resource_key, &shard, max_sessions, stale_after)
                .await
        })
        .await
    }

    /// Admits `session_id` for `resource_key` if the tile server has room,
    /// recording it in storage.
    ///
    /// The capacity check and the write run under one per-tile-server lock,
    /// so concurrent admissions in this process cannot both take the last
    /// slot. Separate processes can still race.
    pub async fn admit(
        &self,
        resource_key: &str,
        session_id: &str,
        max_sessions: u32,
        stale_after: Duration,
    ) -> AppResult<AdmissionResult> {
        self.with_deadline(resource_key, async {
            let shard = self.sharding.get_shard(resource_key).await?;
            let lock = self.lock_for(&shard);
            let _guard = lock.lock().await;

            let has_room = self
                .reconcile_and_evict(resource_key, &shard, max_sessions, stale_after)
                .await?;
            if !has_room {
                warn!(
                    resource_key,
                    shard = %shard,
                    max_sessions,
                    "Session admission denied"
                );
                return Ok(AdmissionResult::Denied {
                    reason: format!("Tile server {shard} is serving {max_sessions} sessions"),
                });
            }

            self.set_session(resource_key, session_id, &shard).await?;
            info!(resource_key, session_id, shard = %shard, "Session admitted");
            Ok(AdmissionResult::Granted)
        })
        .await
    }

    /// Number of sessions recorded for the tile server serving `key`.
    pub async fn get_count(&self, key: &str) -> AppResult<usize> {
        let shard = self.sharding.get_shard(key).await?;
        Ok(self.shard_sessions(key, &shard).await?.len())
    }

    /// Persists a fresh session record for `key`, unconditionally.
    pub async fn set_session(
        &self,
        key: &str,
        session_id: &str,
        shard: &TileServerShard,
    ) -> AppResult<()> {
        let data = SessionData::new(session_id, shard.clone());
        self.storage
            .set(&record_key(shard, key), &serde_json::to_string(&data)?)
            .await?;
        debug!(key, session_id, shard = %shard, "Session recorded");
        Ok(())
    }

    /// Refreshes the last-access timestamp of `key`'s session.
    ///
    /// Returns `false` when no session is recorded.
    pub async fn touch_session(&self, key: &str) -> AppResult<bool> {
        let record = self.record_for(key).await?;
        let Some(raw) = self.storage.get(&record).await? else {
            return Ok(false);
        };
        let mut data: SessionData = serde_json::from_str(&raw)?;
        data.touch();
        self.storage
            .set(&record, &serde_json::to_string(&data)?)
            .await?;
        Ok(true)
    }

    /// Removes `key`'s session, telling the tile server to drop it when
    /// `session.reset_remote_on_evict` is set.
    ///
    /// Returns `false` when no session was recorded.
    pub async fn invalidate_session(&self, key: &str) -> AppResult<bool> {
        let record = self.record_for(key).await?;
        let Some(raw) = self.storage.get(&record).await? else {
            return Ok(false);
        };

        if self.config.reset_remote_on_evict {
            match serde_json::from_str::<SessionData>(&raw) {
                Ok(data) => self.remote.reset_sessions(&[data]).await?,
                Err(e) => warn!(key, error = %e, "Dropping unparseable session record"),
            }
        }

        let removed = self.storage.delete(&record).await?;
        info!(key, "Session invalidated");
        Ok(removed > 0)
    }

    /// Steps 2-6 of an admission check, for an already resolved shard.
    async fn reconcile_and_evict(
        &self,
        resource_key: &str,
        shard: &TileServerShard,
        max_sessions: u32,
        stale_after: Duration,
    ) -> AppResult<bool> {
        let remote_sessions = self.remote.get_sessions(shard).await?;
        self.storage
            .update(resource_key, &remote_sessions, shard)
            .await?;

        let mut sessions = self.shard_sessions(resource_key, shard).await?;
        let max = max_sessions as usize;
        if sessions.len() < max {
            debug!(
                resource_key,
                shard = %shard,
                count = sessions.len(),
                max_sessions,
                "Tile server has room"
            );
            return Ok(true);
        }

        // Evict down to the cap, and at least one session when already at it.
        let needed = (sessions.len() - max).max(1);
        let now = Utc::now();
        sessions.retain(|(_, data)| data.is_stale(stale_after, now));
        if sessions.len() < needed {
            debug!(
                resource_key,
                shard = %shard,
                stale = sessions.len(),
                needed,
                "Not enough stale sessions to reach the cap"
            );
            return Ok(false);
        }

        sessions.sort_by_key(|(_, data)| data.last_access_timestamp);
        sessions.truncate(needed);

        if self.config.reset_remote_on_evict {
            let evicted: Vec<SessionData> = sessions.iter().map(|(_, d)| d.clone()).collect();
            self.remote.reset_sessions(&evicted).await?;
        }
        for (key, data) in &sessions {
            self.storage.delete(key).await?;
            warn!(
                resource_key = %resource_key_of(key),
                session_id = %data.session_id,
                last_access = %data.last_access_timestamp,
                shard = %shard,
                "Evicted stale session"
            );
        }

        Ok(true)
    }

    /// Records of tile server `shard`, which serves `key`.
    async fn shard_sessions(
        &self,
        key: &str,
        shard: &TileServerShard,
    ) -> AppResult<Vec<(String, SessionData)>> {
        let entries = self
            .storage
            .get_all_key_values(&record_key(shard, key))
            .await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry.session_data {
                Some(data) if data.shard == *shard => Some((entry.key, data)),
                _ => None,
            })
            .collect())
    }

    /// Storage key of `key`'s record on the tile server serving it.
    async fn record_for(&self, key: &str) -> AppResult<String> {
        let shard = self.sharding.get_shard(key).await?;
        Ok(record_key(&shard, key))
    }

    fn lock_for(&self, shard: &TileServerShard) -> Arc<Mutex<()>> {
        self.admission_locks
            .entry(shard.url().to_string())
            .or_default()
            .clone()
    }

    async fn with_deadline<T>(
        &self,
        resource_key: &str,
        fut: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        let deadline = self.config.sync_timeout();
        tokio::time::timeout(deadline, fut).await.map_err(|_| {
            AppError::timeout(format!(
                "Session sync for '{resource_key}' exceeded {}ms",
                deadline.as_millis()
            ))
        })?
    }
}
