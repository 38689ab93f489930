//! Storage keys for session records.
//!
//! A record key carries the URL of its tile server as a hash tag in front of
//! the resource key:
//!
//! ```text
//! {http://tiles-a:5000}slides/case-1.svs
//! ```
//!
//! Storage backends route on the tag alone, so every record of one tile
//! server lands on the same storage shard and a shard-scoped listing sees
//! all of them.

use super::shard::{Shard, TileServerShard};

/// Build the storage key for `resource_key` served by `shard`.
pub fn record_key(shard: &TileServerShard, resource_key: &str) -> String {
    format!("{{{}}}{resource_key}", shard.url())
}

/// The hash tag of `key`, if it carries a non-empty one.
pub fn tag_of(key: &str) -> Option<&str> {
    let rest = key.strip_prefix('{')?;
    let end = rest.find('}')?;
    (end > 0).then(|| &rest[..end])
}

/// The part of `key` used to pick a storage shard: the tag when present,
/// otherwise the whole key.
pub fn routing_key(key: &str) -> &str {
    tag_of(key).unwrap_or(key)
}

/// The resource key inside a record key. Untagged keys are returned as is.
pub fn resource_key_of(key: &str) -> &str {
    match tag_of(key) {
        Some(tag) => &key[tag.len() + 2..],
        None => key,
    }
}
