//! Session status resolution.
//!
//! A status is derived from two sources: the object's metadata (which edge
//! write token is live, which recording period is current, when a part was
//! last finalized) and a single probe of the LRO status endpoint. The
//! resolver only reads metadata.

use crate::env::meta;
use crate::fabric::{
    LroClient, MetadataGateway, normalize_node_api, read_typed, report_control_result,
};
use crate::session::config::SessionRegistry;
use crate::session::metadata::{FabricNodeConfig, Recordings};
use crate::session::poll::Clock;
use crate::session::types::{SessionError, SessionState, SessionStatus};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Refine the raw LRO state with finalization freshness.
///
/// 1. `running` with nothing finalized yet is `starting`
/// 2. `running` with the last finalization older than the threshold is `stalled`
/// 3. anything else is taken as reported
pub fn refine_state(
    raw: &str,
    last_finalization_time: i64,
    since_last_finalize_sec: Option<f64>,
    stall_threshold_secs: f64,
) -> SessionState {
    let state = SessionState::from_remote(raw);
    if state != SessionState::Running {
        return state;
    }

    if last_finalization_time == 0 {
        return SessionState::Starting;
    }

    match since_last_finalize_sec {
        Some(since) if since > stall_threshold_secs => SessionState::Stalled,
        _ => SessionState::Running,
    }
}

/// Builds [`SessionStatus`] snapshots
pub struct StatusResolver {
    registry: Arc<SessionRegistry>,
    gateway: Arc<dyn MetadataGateway>,
    lro: Arc<dyn LroClient>,
    clock: Arc<dyn Clock>,
    stall_threshold_secs: f64,
}

impl StatusResolver {
    pub fn new(
        registry: Arc<SessionRegistry>,
        gateway: Arc<dyn MetadataGateway>,
        lro: Arc<dyn LroClient>,
        clock: Arc<dyn Clock>,
        stall_threshold_secs: f64,
    ) -> Self {
        Self {
            registry,
            gateway,
            lro,
            clock,
            stall_threshold_secs,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Resolve the current state of session `name`.
    ///
    /// The LRO is probed only when the edge metadata points at an existing
    /// recording period. A failed probe yields `stopped`. With
    /// `request_stop`, an in-flight LRO is sent a stop request whose outcome
    /// does not affect the returned state: callers see the state observed
    /// before the stop.
    pub async fn resolve(
        &self,
        name: &str,
        request_stop: bool,
    ) -> Result<SessionStatus, SessionError> {
        let Some(config) = self.registry.get(name) else {
            warn!("Unknown session '{}'", name);
            return Err(SessionError::ConfigNotFound(name.to_string()));
        };
        let library_id = self
            .registry
            .library_id_for(&config.object_id)
            .ok_or_else(|| SessionError::ConfigNotFound(name.to_string()))?;

        let fabric: FabricNodeConfig = read_typed(
            self.gateway.as_ref(),
            library_id,
            &config.object_id,
            meta::FABRIC_CONFIG,
        )
        .await?
        .unwrap_or_default();

        let node_api = fabric
            .node_api(config.node_hint.as_deref())
            .ok_or_else(|| SessionError::NodeNotConfigured(name.to_string()))?;

        let mut status = SessionStatus::new(name, library_id, &config.object_id);
        status.fabric_api = Some(normalize_node_api(node_api)?);

        let Some(write_token) = fabric.edge_write_token() else {
            debug!("Session '{}' has no edge write token", name);
            return Ok(status);
        };
        status.edge_write_token = Some(write_token.to_string());

        let recordings: Recordings =
            read_typed(self.gateway.as_ref(), library_id, write_token, meta::RECORDINGS)
                .await?
                .unwrap_or_default();

        let Some(period) = recordings.current_period() else {
            debug!(
                "Session '{}' has no current recording period (sequence {:?}, {} periods)",
                name,
                recordings.recording_sequence,
                recordings.live_offering.len()
            );
            return Ok(status);
        };

        let Some(handle) = period.handle() else {
            warn!(
                "Recording period {:?} of '{}' has no LRO handle",
                recordings.recording_sequence, name
            );
            return Ok(status);
        };

        let since_last_finalize = period.since_last_finalize_sec(self.clock.now());
        status.tlro = Some(handle.to_string());
        status.recording_period = Some(period.clone());
        status.since_last_finalize_sec = since_last_finalize;

        let Some(target) = status.lro_target() else {
            return Ok(status);
        };
        let status_url = target.status_url(handle);
        status.lro_status_url = Some(status_url.clone());

        status.state = match self.lro.probe(&status_url).await {
            Ok(report) => refine_state(
                &report.state,
                period.video_finalized_parts_info.last_finalization_time,
                since_last_finalize,
                self.stall_threshold_secs,
            ),
            Err(e) => {
                warn!("LRO status probe for '{}' failed: {}", name, e);
                SessionState::Stopped
            }
        };
        debug!("Session '{}' resolved to {}", name, status.state);

        if request_stop && status.state.is_stoppable() {
            info!("Requesting stop of '{}' ({})", name, status.state);
            let result = self.lro.stop(&target, handle).await;
            report_control_result("stop", name, &result);
        }

        Ok(status)
    }
}
