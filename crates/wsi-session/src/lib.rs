//! # wsi-session
//!
//! Admission control for whole-slide-image viewing sessions.
//!
//! ## Modules
//!
//! - `manager`: reconciles cached session records against the tile-server
//!   fleet, evicts stale sessions and decides admission
//! - `admission`: admission outcomes
//! - `remote`: tile-server session handlers (HTTP, and in-memory for tests)

pub mod admission;
pub mod manager;
pub mod remote;

pub use admission::AdmissionResult;
pub use manager::SessionManager;
pub use remote::{HttpRemoteSessionHandler, InMemoryRemoteSessionHandler};
