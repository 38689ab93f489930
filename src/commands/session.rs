//! Session admission CLI commands.

use std::process::ExitCode;
use std::time::Duration;

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use wsi_core::result::AppResult;
use wsi_session::AdmissionResult;

use super::Context;
use crate::output::{self, OutputFormat};

/// Arguments naming a single resource
#[derive(Debug, Args)]
pub struct ResourceArgs {
    /// Resource key (e.g. slide path)
    #[arg(short, long)]
    pub resource: String,
}

/// Arguments for a capacity check
#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Resource key (e.g. slide path)
    #[arg(short, long)]
    pub resource: String,
    /// Session cap for the tile server; defaults to session.max_sessions
    #[arg(long)]
    pub max: Option<u32>,
    /// Staleness window in seconds; defaults to session.stale_after_seconds
    #[arg(long)]
    pub stale_after: Option<u64>,
}

/// Arguments for an admission
#[derive(Debug, Args)]
pub struct AdmitArgs {
    /// Resource key (e.g. slide path)
    #[arg(short, long)]
    pub resource: String,
    /// Session id to record; a random one is generated when omitted
    #[arg(short, long)]
    pub session: Option<String>,
    /// Session cap for the tile server; defaults to session.max_sessions
    #[arg(long)]
    pub max: Option<u32>,
    /// Staleness window in seconds; defaults to session.stale_after_seconds
    #[arg(long)]
    pub stale_after: Option<u64>,
}

/// Count display row
#[derive(Debug, Serialize, Tabled)]
struct CountRow {
    resource: String,
    sessions: usize,
}

/// Capacity display row
#[derive(Debug, Serialize, Tabled)]
struct SyncRow {
    resource: String,
    max_sessions: u32,
    sessions: usize,
    has_room: bool,
}

/// Admission display row
#[derive(Debug, Serialize, Tabled)]
struct AdmitRow {
    resource: String,
    session: String,
    granted: bool,
    reason: String,
}

fn limits(ctx: &Context, max: Option<u32>, stale_after: Option<u64>) -> (u32, Duration) {
    let session = ctx.manager.config();
    (
        max.unwrap_or(session.max_sessions),
        stale_after.map_or_else(|| session.stale_after(), Duration::from_secs),
    )
}

/// Print the number of sessions on the resource's tile server.
pub async fn count(ctx: &Context, args: &ResourceArgs, format: OutputFormat) -> AppResult<ExitCode> {
    let sessions = ctx.manager.get_count(&args.resource).await?;
    output::print_item(
        &CountRow {
            resource: args.resource.clone(),
            sessions,
        },
        format,
    );
    Ok(ExitCode::SUCCESS)
}

/// Reconcile, evict stale sessions, and report whether one more fits.
pub async fn sync(ctx: &Context, args: &SyncArgs, format: OutputFormat) -> AppResult<ExitCode> {
    let (max_sessions, stale_after) = limits(ctx, args.max, args.stale_after);
    let has_room = ctx
        .manager
        .sync_and_invalidate_sessions(&args.resource, max_sessions, stale_after)
        .await?;
    let sessions = ctx.manager.get_count(&args.resource).await?;

    output::print_item(
        &SyncRow {
            resource: args.resource.clone(),
            max_sessions,
            sessions,
            has_room,
        },
        format,
    );
    Ok(if has_room {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

/// Admit a session, exiting with status 2 when the tile server is full.
pub async fn admit(ctx: &Context, args: &AdmitArgs, format: OutputFormat) -> AppResult<ExitCode> {
    let (max_sessions, stale_after) = limits(ctx, args.max, args.stale_after);
    let session_id = args
        .session
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let result = ctx
        .manager
        .admit(&args.resource, &session_id, max_sessions, stale_after)
        .await?;

    let (granted, reason) = match &result {
        AdmissionResult::Granted => (true, String::new()),
        AdmissionResult::Denied { reason } => (false, reason.clone()),
    };
    output::print_item(
        &AdmitRow {
            resource: args.resource.clone(),
            session: session_id,
            granted,
            reason,
        },
        format,
    );
    Ok(if granted {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

/// Refresh the last-access time of a session.
pub async fn touch(ctx: &Context, args: &ResourceArgs) -> AppResult<ExitCode> {
    if ctx.manager.touch_session(&args.resource).await? {
        output::print_success(&format!("Session for '{}' refreshed", args.resource));
        Ok(ExitCode::SUCCESS)
    } else {
        output::print_warning(&format!("No session recorded for '{}'", args.resource));
        Ok(ExitCode::from(2))
    }
}

/// Drop a session locally and on its tile server.
pub async fn invalidate(ctx: &Context, args: &ResourceArgs) -> AppResult<ExitCode> {
    if ctx.manager.invalidate_session(&args.resource).await? {
        output::print_success(&format!("Session for '{}' invalidated", args.resource));
    } else {
        output::print_warning(&format!("No session recorded for '{}'", args.resource));
    }
    Ok(ExitCode::SUCCESS)
}
