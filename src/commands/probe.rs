//! Redis node health probe.

use std::process::ExitCode;

use futures::future::join_all;
use serde::Serialize;
use tabled::Tabled;

use wsi_core::result::AppResult;
use wsi_core::traits::storage::KeyValueStorage;
use wsi_core::types::shard::Shard;

use super::Context;
use crate::output::{self, OutputFormat};

/// Node health display row
#[derive(Debug, Serialize, Tabled)]
struct NodeRow {
    /// Node URL
    node: String,
    /// Reachable
    online: bool,
}

/// Ping every storage node concurrently. Fails when any node is down.
pub async fn execute(ctx: &Context, format: OutputFormat) -> AppResult<ExitCode> {
    let timeout = ctx.config.storage.ping_timeout();
    let checks = ctx
        .redis_nodes
        .iter()
        .map(|node| ctx.storage.is_node_online(node.url(), timeout));
    let results = join_all(checks).await;

    let rows: Vec<NodeRow> = ctx
        .redis_nodes
        .iter()
        .zip(results)
        .map(|(node, online)| NodeRow {
            node: node.url().to_string(),
            online,
        })
        .collect();
    output::print_list(&rows, format);

    if rows.iter().all(|r| r.online) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
