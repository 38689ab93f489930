//! # wsi-core
//!
//! Core crate for the whole-slide-image session manager. Contains the
//! capability traits (key-value storage, sharding, remote session
//! handling), configuration schemas, shard and session value types,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other WSI crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
