//! Core type definitions used across the workspace.

pub mod record_key;
pub mod session_data;
pub mod shard;

pub use record_key::{record_key, resource_key_of, routing_key};
pub use session_data::{KeyValueEntry, SessionData};
pub use shard::{RedisShard, Shard, TileServerShard};
