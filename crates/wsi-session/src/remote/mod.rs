//! Tile-server session handlers.

pub mod http;
pub mod memory;

pub use http::HttpRemoteSessionHandler;
pub use memory::InMemoryRemoteSessionHandler;
