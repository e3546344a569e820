//! Edge session lifecycle.
//!
//! An edge session is an open write token on the session's content object.
//! All session metadata (recording periods, persisted status) is staged
//! under it. Starting a session opens the token and publishes it in a new
//! object version; stopping a session marks the staged status closed.

use crate::env::meta;
use crate::fabric::{ContentEdit, FabricError, MetadataGateway, TokenIssuer, TokenScope};
use crate::session::config::SessionConfig;
use crate::session::controller::SessionController;
use crate::session::metadata::{FabricNodeConfig, LiveRecordingMetadata, PersistedStatus};
use crate::session::poll::Clock;
use crate::session::types::{ControlOutcome, SessionError, SessionState};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A freshly opened edge session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeSession {
    pub name: String,
    pub library_id: String,
    pub object_id: String,
    pub fabric_api: String,
    pub edge_write_token: String,
    /// Object version that publishes the edge write token
    pub version_hash: String,
    /// Authorization token for ingest clients, scoped to the write token
    pub ingest_token: String,
}

/// An edge session marked closed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosedSession {
    pub name: String,
    pub edge_write_token: String,
    pub state: String,
    pub recording_stop_time: i64,
}

/// Opens and closes edge sessions
pub struct EdgeSessionManager {
    gateway: Arc<dyn MetadataGateway>,
    tokens: Arc<dyn TokenIssuer>,
    controller: Arc<SessionController>,
    clock: Arc<dyn Clock>,
}

impl EdgeSessionManager {
    pub fn new(
        gateway: Arc<dyn MetadataGateway>,
        tokens: Arc<dyn TokenIssuer>,
        controller: Arc<SessionController>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gateway,
            tokens,
            controller,
            clock,
        }
    }

    fn config(&self, name: &str) -> Result<SessionConfig, SessionError> {
        self.controller
            .resolver()
            .registry()
            .get(name)
            .cloned()
            .ok_or_else(|| SessionError::ConfigNotFound(name.to_string()))
    }

    /// Open a new edge session for `name`.
    ///
    /// The edge write token is recorded twice: staged under the token itself,
    /// and in a finalized object version so that later status reads on the
    /// object find it. This is the only call that commits a version.
    ///
    /// Refused while an LRO may still run under the current token. A
    /// `stopped` session (status probe failing) may be replaced.
    pub async fn start_session(&self, name: &str) -> Result<EdgeSession, SessionError> {
        let _guard = self.controller.locks().lock(name).await;
        let config = self.config(name)?;
        let library_id = config.library_id.clone();

        let status = self.controller.resolver().resolve(name, false).await?;
        if !(status.state.is_idle() || status.state == SessionState::Stopped) {
            warn!(
                "Session '{}' is {}, not opening a new edge session",
                name, status.state
            );
            return Err(SessionError::SessionActive(Box::new(status)));
        }
        let fabric_api = status
            .fabric_api
            .clone()
            .ok_or_else(|| SessionError::NodeNotConfigured(name.to_string()))?;

        let edge_write_token = self
            .gateway
            .open_edit(&library_id, &config.object_id)
            .await?;
        info!("Opened edge write token {} for '{}'", edge_write_token, name);

        let patch = LiveRecordingMetadata {
            fabric_config: Some(FabricNodeConfig {
                edge_write_token: Some(edge_write_token.clone()),
                ..Default::default()
            }),
            status: Some(PersistedStatus::active()),
            ..Default::default()
        };
        let patch = serde_json::to_value(&patch).map_err(FabricError::from)?;

        let edge = ContentEdit {
            library_id: library_id.clone(),
            object_id: config.object_id.clone(),
            write_token: edge_write_token.clone(),
        };
        self.gateway
            .merge_metadata(&edge, meta::LIVE_RECORDING, &patch)
            .await?;

        let commit = ContentEdit {
            write_token: self
                .gateway
                .open_edit(&library_id, &config.object_id)
                .await?,
            ..edge
        };
        self.gateway
            .merge_metadata(&commit, meta::LIVE_RECORDING, &patch)
            .await?;
        let version_hash = self.gateway.finalize(&commit).await?;
        debug!("Published edge write token of '{}' in {}", name, version_hash);

        let ingest_token = self
            .tokens
            .issue(&TokenScope {
                library_id: library_id.clone(),
                object_id: config.object_id.clone(),
                write_token: Some(edge_write_token.clone()),
            })
            .await?;

        info!("Session '{}' active ({})", name, version_hash);
        Ok(EdgeSession {
            name: name.to_string(),
            library_id,
            object_id: config.object_id,
            fabric_api,
            edge_write_token,
            version_hash,
            ingest_token,
        })
    }

    /// Close the edge session of `name`.
    ///
    /// Any LRO still in flight is stopped and awaited first. The closed
    /// status is written under the existing write token and is not
    /// finalized.
    pub async fn stop_session(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ClosedSession, SessionError> {
        let _guard = self.controller.locks().lock(name).await;
        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SessionError::Cancelled(name.to_string())),
            status = self.controller.resolver().resolve(name, false) => status?,
        };

        let Some(edge_write_token) = status.edge_write_token.clone() else {
            return Err(SessionError::NoEdgeSession(name.to_string()));
        };

        let status = if status.state.is_idle() {
            status
        } else {
            match self.controller.stop_and_converge(name, status, cancel).await {
                ControlOutcome::Converged(status) | ControlOutcome::Unchanged(status) => status,
                ControlOutcome::TimedOut(status) => {
                    return Err(SessionError::ConvergenceTimeout(Box::new(status)));
                }
                ControlOutcome::Cancelled(_) => {
                    return Err(SessionError::Cancelled(name.to_string()));
                }
                ControlOutcome::ConfigError(e) => return Err(e),
            }
        };

        if cancel.is_cancelled() {
            return Err(SessionError::Cancelled(name.to_string()));
        }

        let recording_stop_time = self.clock.now().timestamp();
        let closed = PersistedStatus::closed(recording_stop_time);
        let edge = ContentEdit {
            library_id: status.library_id.clone(),
            object_id: status.object_id.clone(),
            write_token: edge_write_token.clone(),
        };
        self.gateway
            .replace_metadata(
                &edge,
                meta::STATUS,
                &serde_json::to_value(&closed).map_err(FabricError::from)?,
            )
            .await?;

        info!("Session '{}' closed", name);
        Ok(ClosedSession {
            name: name.to_string(),
            edge_write_token,
            state: closed.state,
            recording_stop_time,
        })
    }
}
