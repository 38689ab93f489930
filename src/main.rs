//! WSI session daemon entry point.
//!
//! Composition root: loads configuration, initializes logging, builds the
//! shard registries, storage and the session manager, then runs the
//! requested command.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

mod commands;
mod output;

use commands::Cli;
use wsi_core::config::AppConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config);

    match cli.execute(config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(kind = %e.kind, "Command failed: {}", e.message);
            output::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing/logging. Logs go to stderr so command output on
/// stdout stays machine-readable.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
