//! Unified application error types for the session manager.
//!
//! All crates map their internal errors into [`AppError`] so failures
//! propagate through the `?` operator unchanged. The orchestrator never
//! re-wraps an `AppError`; the caller decides how a kind maps onto its
//! own protocol (HTTP status, retry-after, and so on).

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A configuration error occurred (unknown provider, no client for a shard, ...).
    Configuration,
    /// A shard pool was empty when a key had to be routed.
    NoShardsAvailable,
    /// The key-value tier failed or could not be reached.
    Cache,
    /// The remote tile-server fleet failed or could not be reached.
    ExternalService,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An operation exceeded its deadline.
    Timeout,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::NoShardsAvailable => write!(f, "NO_SHARDS_AVAILABLE"),
            Self::Cache => write!(f, "CACHE"),
            Self::ExternalService => write!(f, "EXTERNAL_SERVICE"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an empty-shard-pool error.
    pub fn no_shards(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoShardsAvailable, message)
    }

    /// Create a cache (key-value transport) error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cache, message)
    }

    /// Create a remote tile-server error.
    pub fn external_service(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalService, message)
    }

    /// Create a deadline error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Whether this error is fatal for the operation and should not be retried
    /// without operator intervention.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Configuration | ErrorKind::NoShardsAvailable
        )
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
