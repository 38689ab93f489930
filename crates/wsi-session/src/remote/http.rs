//! HTTP client for the tile servers' session-reporting endpoints.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use wsi_core::config::tile_server::TileServerConfig;
use wsi_core::error::{AppError, ErrorKind};
use wsi_core::result::AppResult;
use wsi_core::traits::remote::{RemoteSessionHandler, RemoteSessions};
use wsi_core::types::session_data::SessionData;
use wsi_core::types::shard::{Shard, TileServerShard};

/// Body of a reset request.
#[derive(Debug, Serialize)]
struct ResetRequest<'a> {
    sessions: Vec<&'a str>,
}

/// Talks to each tile server over HTTP.
///
/// - `GET {node}{sessions_path}` returns `{"<sessionId>": "<resourceKey>", ...}`
/// - `POST {node}{reset_path}` with `{"sessions": ["<sessionId>", ...]}`
#[derive(Debug, Clone)]
pub struct HttpRemoteSessionHandler {
    client: reqwest::Client,
    sessions_path: String,
    reset_path: String,
}

impl HttpRemoteSessionHandler {
    /// Create a handler from configuration.
    pub fn new(config: &TileServerConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;

        Ok(Self {
            client,
            sessions_path: config.sessions_path.clone(),
            reset_path: config.reset_path.clone(),
        })
    }

    /// Map a transport error to an AppError.
    fn map_err(shard: &TileServerShard, e: reqwest::Error) -> AppError {
        AppError::with_source(
            ErrorKind::ExternalService,
            format!("Tile server {shard} request failed: {e}"),
            e,
        )
    }
}

/// Join a node URL and an endpoint path with exactly one slash.
fn endpoint(shard: &TileServerShard, path: &str) -> String {
    format!(
        "{}/{}",
        shard.url().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[async_trait]
impl RemoteSessionHandler for HttpRemoteSessionHandler {
    async fn get_sessions(&self, shard: &TileServerShard) -> AppResult<RemoteSessions> {
        let url = endpoint(shard, &self.sessions_path);
        let sessions: RemoteSessions = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| Self::map_err(shard, e))?
            .json()
            .await
            .map_err(|e| Self::map_err(shard, e))?;

        debug!(shard = %shard, count = sessions.len(), "Fetched tile-server sessions");
        Ok(sessions)
    }

    async fn reset_sessions(&self, sessions: &[SessionData]) -> AppResult<()> {
        let mut by_shard: BTreeMap<&str, (&TileServerShard, Vec<&str>)> = BTreeMap::new();
        for data in sessions {
            by_shard
                .entry(data.shard.url())
                .or_insert_with(|| (&data.shard, Vec::new()))
                .1
                .push(data.session_id.as_str());
        }

        for (shard, ids) in by_shard.into_values() {
            let count = ids.len();
            self.client
                .post(endpoint(shard, &self.reset_path))
                .json(&ResetRequest { sessions: ids })
                .send()
                .await
                .and_then(|resp| resp.error_for_status())
                .map_err(|e| Self::map_err(shard, e))?;
            info!(shard = %shard, count, "Reset tile-server sessions");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_with_single_slash() {
        let shard = TileServerShard::new("http://tiles:5000/");
        assert_eq!(endpoint(&shard, "/sessions"), "http://tiles:5000/sessions");
        assert_eq!(endpoint(&shard, "sessions/reset"), "http://tiles:5000/sessions/reset");

        let bare = TileServerShard::new("http://tiles:5000");
        assert_eq!(endpoint(&bare, "/sessions"), "http://tiles:5000/sessions");
    }

    #[test]
    fn test_reset_body_shape() {
        let body = serde_json::to_value(ResetRequest {
            sessions: vec!["a", "b"],
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"sessions": ["a", "b"]}));
    }

    #[tokio::test]
    async fn test_reset_with_nothing_sends_nothing() {
        let handler = HttpRemoteSessionHandler::new(&TileServerConfig::default()).unwrap();
        handler.reset_sessions(&[]).await.unwrap();
    }
}
