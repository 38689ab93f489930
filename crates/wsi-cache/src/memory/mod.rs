//! In-process sharded storage.

pub mod store;

pub use store::MemoryKeyValueStorage;
