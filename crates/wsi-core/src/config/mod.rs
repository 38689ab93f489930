//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod logging;
pub mod session;
pub mod storage;
pub mod tile_server;

use serde::{Deserialize, Serialize};

use self::logging::LoggingConfig;
use self::session::SessionConfig;
use self::storage::StorageConfig;
use self::tile_server::TileServerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Key-value tier (Redis shard pool) settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Tile-server shard pool settings.
    #[serde(default)]
    pub tile_servers: TileServerConfig,
    /// Admission and expiry settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `WSI_` (sections separated by
    /// `__`, e.g. `WSI_SESSION__MAX_SESSIONS=4`).
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("WSI")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("storage.nodes")
                    .with_list_parse_key("tile_servers.nodes")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the core cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.storage.provider == "redis" && self.storage.nodes.is_empty() {
            return Err(AppError::configuration(
                "storage.nodes must list at least one Redis endpoint",
            ));
        }
        if self.tile_servers.nodes.is_empty() {
            return Err(AppError::configuration(
                "tile_servers.nodes must list at least one tile-server endpoint",
            ));
        }
        if self.session.max_sessions == 0 {
            return Err(AppError::configuration(
                "session.max_sessions must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.nodes = vec!["redis://localhost:6379".to_string()];
        config.tile_servers.nodes = vec!["http://localhost:5000".to_string()];
        config
    }

    #[test]
    fn test_defaults_validate_once_pools_are_set() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_empty_tile_pool_rejected() {
        let mut config = valid();
        config.tile_servers.nodes.clear();
        let err = config.validate().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_memory_provider_needs_no_redis_nodes() {
        let mut config = valid();
        config.storage.provider = "memory".to_string();
        config.storage.nodes.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_max_sessions_rejected() {
        let mut config = valid();
        config.session.max_sessions = 0;
        assert!(config.validate().is_err());
    }
}
