//! Sharded key-value storage trait.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::result::AppResult;
use crate::types::record_key::{record_key, tag_of};
use crate::types::session_data::{KeyValueEntry, SessionData};
use crate::types::shard::{Shard, TileServerShard};

use super::remote::RemoteSessions;

/// Trait for sharded key-value backends (Redis, or in-memory for tests).
///
/// Every call resolves the shard for its key and delegates to that shard
/// only. Keys carrying a hash tag route on the tag (see
/// [`routing_key`](crate::types::record_key::routing_key)). Values are
/// strings; session records are JSON [`SessionData`].
#[async_trait]
pub trait KeyValueStorage: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key. Returns `None` if the key does not exist.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value. Fails with a configuration error when the resolved
    /// shard has no client.
    async fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// Delete a key. Returns the number of removed entries.
    async fn delete(&self, key: &str) -> AppResult<u64>;

    /// Check whether a key exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// List every key stored on the shard that `key` resolves to.
    ///
    /// `key` only selects the shard; this is not a global listing.
    async fn get_all_keys(&self, key: &str) -> AppResult<Vec<String>>;

    /// Ping the node at `url`, giving up after `timeout`. Never fails:
    /// any error or an elapsed deadline reports `false`.
    async fn is_node_online(&self, url: &str, timeout: Duration) -> bool;

    /// List every key on `key`'s shard with its parsed session record.
    ///
    /// A value that is missing or fails to parse is reported with
    /// `session_data: None` instead of failing the whole listing.
    async fn get_all_key_values(&self, key: &str) -> AppResult<Vec<KeyValueEntry>> {
        let keys = self.get_all_keys(key).await?;
        let mut entries = Vec::with_capacity(keys.len());

        for stored_key in keys {
            let session_data = match self.get(&stored_key).await? {
                Some(raw) => match serde_json::from_str::<SessionData>(&raw) {
                    Ok(data) => Some(data),
                    Err(e) => {
                        warn!(key = %stored_key, error = %e, "Unparseable session record");
                        None
                    }
                },
                None => None,
            };
            entries.push(KeyValueEntry {
                key: stored_key,
                session_data,
            });
        }

        Ok(entries)
    }

    /// Make the records of tile server `shard` conform to the authoritative
    /// `sessions` it reports (session id -> resource key).
    ///
    /// `key` is any resource key served by `shard`; records are read and
    /// written under [`record_key`], so the listing covers every record of
    /// `shard`.
    ///
    /// 1. Lists the storage shard holding `shard`'s records.
    /// 2. Deletes records of `shard` (and unparseable ones) that the tile
    ///    server no longer reports.
    /// 3. Writes a fresh record for every reported session not yet recorded,
    ///    or recorded under a different session id.
    ///
    /// When several sessions are reported for one resource key the lowest
    /// session id is kept, so repeated calls converge on the same record.
    async fn update(
        &self,
        key: &str,
        sessions: &RemoteSessions,
        shard: &TileServerShard,
    ) -> AppResult<()> {
        let existing = self.get_all_key_values(&record_key(shard, key)).await?;

        let mut wanted: HashMap<String, &str> = HashMap::with_capacity(sessions.len());
        for (session_id, resource_key) in sessions {
            match wanted.entry(record_key(shard, resource_key)) {
                Entry::Vacant(slot) => {
                    slot.insert(session_id);
                }
                Entry::Occupied(mut slot) => {
                    let (kept, dropped) = if session_id.as_str() < *slot.get() {
                        (session_id.as_str(), *slot.get())
                    } else {
                        (*slot.get(), session_id.as_str())
                    };
                    warn!(
                        resource_key = %resource_key,
                        shard = %shard,
                        kept,
                        dropped,
                        "Tile server reports several sessions for one resource"
                    );
                    slot.insert(kept);
                }
            }
        }

        let mut removed = 0usize;
        for entry in &existing {
            let belongs_here = match &entry.session_data {
                Some(data) => data.shard == *shard,
                None => tag_of(&entry.key).is_none_or(|tag| tag == shard.url()),
            };
            if belongs_here && !wanted.contains_key(&entry.key) {
                removed += self.delete(&entry.key).await? as usize;
            }
        }

        let recorded: HashMap<&str, &SessionData> = existing
            .iter()
            .filter_map(|e| e.session_data.as_ref().map(|data| (e.key.as_str(), data)))
            .collect();

        let mut added = 0usize;
        for (record, session_id) in &wanted {
            let up_to_date = recorded
                .get(record.as_str())
                .is_some_and(|data| data.session_id == *session_id && data.shard == *shard);
            if up_to_date {
                continue;
            }

            let data = SessionData::new(*session_id, shard.clone());
            self.set(record, &serde_json::to_string(&data)?).await?;
            added += 1;
        }

        debug!(
            key,
            shard = %shard,
            removed,
            added,
            remote = sessions.len(),
            "Reconciled session records"
        );
        Ok(())
    }
}
