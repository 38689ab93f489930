//! Capability traits defined in `wsi-core` and implemented by other crates.

pub mod remote;
pub mod sharding;
pub mod storage;

pub use remote::{RemoteSessionHandler, RemoteSessions};
pub use sharding::ShardingAlgorithm;
pub use storage::KeyValueStorage;
