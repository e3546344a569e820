use crate::fabric::{FabricError, LroTarget};
use crate::session::metadata::RecordingPeriod;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Discrete state of a live recording session, derived from metadata and one
/// LRO probe
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Nothing has ever been recorded under the current edge write token
    Inactive,
    /// LRO reports running but no part has been finalized yet
    Starting,
    Running,
    /// LRO reports running but finalized output is stale
    Stalled,
    /// The status probe failed
    Stopped,
    Terminated,
    /// Any other value the LRO reports, kept verbatim
    Other(String),
}

impl SessionState {
    /// Map a raw LRO state string without refinement
    pub fn from_remote(raw: &str) -> Self {
        match raw {
            "inactive" => SessionState::Inactive,
            "starting" => SessionState::Starting,
            "running" => SessionState::Running,
            "stalled" => SessionState::Stalled,
            "stopped" => SessionState::Stopped,
            "terminated" => SessionState::Terminated,
            other => SessionState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SessionState::Inactive => "inactive",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Stalled => "stalled",
            SessionState::Stopped => "stopped",
            SessionState::Terminated => "terminated",
            SessionState::Other(raw) => raw,
        }
    }

    /// No LRO in flight: a new one may be started
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Terminated | SessionState::Inactive)
    }

    /// States in which an LRO exists that a stop request can reach
    pub fn is_stoppable(&self) -> bool {
        matches!(
            self,
            SessionState::Running | SessionState::Stalled | SessionState::Starting
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SessionState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SessionState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SessionState::from_remote(&raw))
    }
}

/// Snapshot of one session, rebuilt on every resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub name: String,
    pub library_id: String,
    pub object_id: String,
    pub fabric_api: Option<String>,
    pub edge_write_token: Option<String>,
    /// LRO handle of the current recording period
    pub tlro: Option<String>,
    pub recording_period: Option<RecordingPeriod>,
    pub since_last_finalize_sec: Option<f64>,
    pub lro_status_url: Option<String>,
    pub state: SessionState,
}

impl SessionStatus {
    pub fn new(name: &str, library_id: &str, object_id: &str) -> Self {
        Self {
            name: name.to_string(),
            library_id: library_id.to_string(),
            object_id: object_id.to_string(),
            fabric_api: None,
            edge_write_token: None,
            tlro: None,
            recording_period: None,
            since_last_finalize_sec: None,
            lro_status_url: None,
            state: SessionState::Inactive,
        }
    }

    /// LRO address for this session; needs a node API and an edge write token
    pub fn lro_target(&self) -> Option<LroTarget> {
        Some(LroTarget {
            fabric_api: self.fabric_api.clone()?,
            library_id: self.library_id.clone(),
            object_id: self.object_id.clone(),
            write_token: self.edge_write_token.clone()?,
        })
    }
}

/// Session-level failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("No session configured with name '{0}'")]
    ConfigNotFound(String),
    #[error("No ingress node configured for session '{0}'")]
    NodeNotConfigured(String),
    #[error("Session '{0}' has no edge write token")]
    NoEdgeSession(String),
    #[error("Metadata error: {0}")]
    Metadata(#[from] FabricError),
    #[error("Session '{}' did not converge, last state {}", .0.name, .0.state)]
    ConvergenceTimeout(Box<SessionStatus>),
    #[error("Session '{}' is {}, stop it before opening a new edge session", .0.name, .0.state)]
    SessionActive(Box<SessionStatus>),
    #[error("Operation on session '{0}' was cancelled")]
    Cancelled(String),
}

/// Control operations on a session's LRO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOperation {
    Start,
    Stop,
    Reset,
}

impl fmt::Display for ControlOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlOperation::Start => write!(f, "start"),
            ControlOperation::Stop => write!(f, "stop"),
            ControlOperation::Reset => write!(f, "reset"),
        }
    }
}

/// Result of a control operation. No failure escapes the controller any
/// other way.
#[derive(Debug, Clone)]
pub enum ControlOutcome {
    /// Start requested while an LRO was already in flight
    Unchanged(SessionStatus),
    /// The target state was observed
    Converged(SessionStatus),
    /// The poll budget ran out; carries the last observed status
    TimedOut(SessionStatus),
    /// Cancelled; carries the last observed status, if one was resolved
    Cancelled(Option<SessionStatus>),
    ConfigError(SessionError),
}

impl ControlOutcome {
    pub fn status(&self) -> Option<&SessionStatus> {
        match self {
            ControlOutcome::Unchanged(status)
            | ControlOutcome::Converged(status)
            | ControlOutcome::TimedOut(status) => Some(status),
            ControlOutcome::Cancelled(status) => status.as_ref(),
            ControlOutcome::ConfigError(_) => None,
        }
    }

    /// Converged, or a no-op on an already active session
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ControlOutcome::Converged(_) | ControlOutcome::Unchanged(_)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            ControlOutcome::Unchanged(_) => "unchanged",
            ControlOutcome::Converged(_) => "converged",
            ControlOutcome::TimedOut(_) => "timed_out",
            ControlOutcome::Cancelled(_) => "cancelled",
            ControlOutcome::ConfigError(_) => "config_error",
        }
    }
}
