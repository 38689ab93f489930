//! CLI command definitions and dispatch.

pub mod probe;
pub mod session;

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use wsi_cache::provider::StorageManager;
use wsi_cache::sharding::{
    ConsistentHashSharding, REDIS_SHARDING_KEY, ShardingRegistry, TILE_SERVER_SHARDING_KEY,
};
use wsi_core::config::AppConfig;
use wsi_core::result::AppResult;
use wsi_core::types::shard::{RedisShard, TileServerShard};
use wsi_session::{HttpRemoteSessionHandler, SessionManager};

use crate::output::OutputFormat;

/// Node name backing the in-memory provider when no Redis nodes are listed.
const LOCAL_MEMORY_NODE: &str = "memory://local";

/// WSI session daemon: admission control for tile-server sessions
#[derive(Debug, Parser)]
#[command(name = "wsi-sessiond", version, about, long_about = None)]
pub struct Cli {
    /// Configuration overlay to load on top of config/default.toml
    #[arg(short, long, env = "WSI_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ping every configured Redis node
    Probe,
    /// Count sessions recorded for the tile server serving a resource
    Count(session::ResourceArgs),
    /// Reconcile with the tile server and report whether a session fits
    Sync(session::SyncArgs),
    /// Admit a new session for a resource
    Admit(session::AdmitArgs),
    /// Refresh the last-access time of a resource's session
    Touch(session::ResourceArgs),
    /// Drop a resource's session locally and on its tile server
    Invalidate(session::ResourceArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> AppResult<ExitCode> {
        let ctx = match self.command {
            Commands::Probe => Context::build_for_probe(config).await?,
            _ => Context::build(config).await?,
        };
        match &self.command {
            Commands::Probe => probe::execute(&ctx, self.format).await,
            Commands::Count(args) => session::count(&ctx, args, self.format).await,
            Commands::Sync(args) => session::sync(&ctx, args, self.format).await,
            Commands::Admit(args) => session::admit(&ctx, args, self.format).await,
            Commands::Touch(args) => session::touch(&ctx, args).await,
            Commands::Invalidate(args) => session::invalidate(&ctx, args).await,
        }
    }
}

/// Wired-up services shared by every command.
pub struct Context {
    /// Loaded configuration.
    pub config: AppConfig,
    /// Redis nodes the storage routes to.
    pub redis_nodes: Vec<RedisShard>,
    /// Sharded session storage.
    pub storage: Arc<StorageManager>,
    /// Session admission manager.
    pub manager: Arc<SessionManager>,
}

impl Context {
    /// Build the shard registries, storage and session manager. Fails if
    /// any storage node is unreachable.
    pub async fn build(config: AppConfig) -> AppResult<Self> {
        Self::connect(config, true).await
    }

    /// Like [`Context::build`], but unreachable storage nodes are left
    /// unconnected so they can be reported offline.
    pub async fn build_for_probe(config: AppConfig) -> AppResult<Self> {
        Self::connect(config, false).await
    }

    async fn connect(config: AppConfig, require_all_nodes: bool) -> AppResult<Self> {
        let mut redis_nodes = RedisShard::pool(&config.storage.nodes);
        if redis_nodes.is_empty() && config.storage.provider == "memory" {
            redis_nodes.push(RedisShard::new(LOCAL_MEMORY_NODE));
        }
        let tile_nodes = TileServerShard::pool(&config.tile_servers.nodes);
        let virtual_nodes = config.storage.virtual_nodes;

        let mut redis_registry = ShardingRegistry::<RedisShard>::new();
        redis_registry.register(
            REDIS_SHARDING_KEY,
            Arc::new(ConsistentHashSharding::new(redis_nodes.clone(), virtual_nodes)),
        );
        let mut tile_registry = ShardingRegistry::<TileServerShard>::new();
        tile_registry.register(
            TILE_SERVER_SHARDING_KEY,
            Arc::new(ConsistentHashSharding::new(tile_nodes, virtual_nodes)),
        );

        info!(
            provider = %config.storage.provider,
            storage_nodes = redis_nodes.len(),
            tile_servers = config.tile_servers.nodes.len(),
            "Initializing session services"
        );

        let redis_sharding = redis_registry.get(REDIS_SHARDING_KEY)?;
        let storage = if require_all_nodes {
            StorageManager::new(&config.storage, redis_sharding).await?
        } else {
            StorageManager::connect_available(&config.storage, redis_sharding).await?
        };
        let storage = Arc::new(storage);
        let remote = Arc::new(HttpRemoteSessionHandler::new(&config.tile_servers)?);
        let manager = Arc::new(SessionManager::new(
            storage.clone(),
            tile_registry.get(TILE_SERVER_SHARDING_KEY)?,
            remote,
            config.session.clone(),
        ));

        Ok(Self {
            config,
            redis_nodes,
            storage,
            manager,
        })
    }
}
