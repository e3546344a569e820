use crate::fabric::{LroClient, report_control_result};
use crate::session::locks::SessionLocks;
use crate::session::poll::{Clock, PollPolicy, PollResult, poll_until};
use crate::session::status::StatusResolver;
use crate::session::types::{
    ControlOperation, ControlOutcome, SessionError, SessionState, SessionStatus,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Drives start/stop/reset of a session's LRO to convergence.
///
/// The controller keeps no session state of its own. Every decision is made
/// on a freshly resolved [`SessionStatus`], and control calls are
/// fire-and-forget: whether they took effect is learned only by polling.
pub struct SessionController {
    resolver: Arc<StatusResolver>,
    lro: Arc<dyn LroClient>,
    clock: Arc<dyn Clock>,
    policy: PollPolicy,
    locks: SessionLocks,
}

impl SessionController {
    pub fn new(
        resolver: Arc<StatusResolver>,
        lro: Arc<dyn LroClient>,
        clock: Arc<dyn Clock>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            resolver,
            lro,
            clock,
            policy,
            locks: SessionLocks::new(),
        }
    }

    pub fn resolver(&self) -> &Arc<StatusResolver> {
        &self.resolver
    }

    pub(crate) fn locks(&self) -> &SessionLocks {
        &self.locks
    }

    /// Current status of `name`. A stop request mutates the remote LRO, so
    /// it takes the session lock.
    pub async fn status(
        &self,
        name: &str,
        request_stop: bool,
    ) -> Result<SessionStatus, SessionError> {
        if request_stop {
            let _guard = self.locks.lock(name).await;
            self.resolver.resolve(name, true).await
        } else {
            self.resolver.resolve(name, false).await
        }
    }

    pub async fn start(&self, name: &str, cancel: &CancellationToken) -> ControlOutcome {
        self.execute(name, ControlOperation::Start, cancel).await
    }

    pub async fn stop(&self, name: &str, cancel: &CancellationToken) -> ControlOutcome {
        self.execute(name, ControlOperation::Stop, cancel).await
    }

    pub async fn reset(&self, name: &str, cancel: &CancellationToken) -> ControlOutcome {
        self.execute(name, ControlOperation::Reset, cancel).await
    }

    /// Run `op` on session `name`.
    ///
    /// - `start` on a session with an LRO in flight is a no-op (`Unchanged`)
    /// - `stop` and `reset` first stop the running LRO and wait for
    ///   `terminated`
    /// - `start` and `reset` then start a new LRO and wait for `starting`
    ///
    /// A new LRO is never started before the previous one is terminated.
    pub async fn execute(
        &self,
        name: &str,
        op: ControlOperation,
        cancel: &CancellationToken,
    ) -> ControlOutcome {
        let _guard = self.locks.lock(name).await;
        info!("Session '{}': {}", name, op);

        let resolved = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Session '{}': {} cancelled before status was resolved", name, op);
                return ControlOutcome::Cancelled(None);
            }
            resolved = self.resolver.resolve(name, false) => resolved,
        };
        let status = match resolved {
            Ok(status) => status,
            Err(e) => {
                error!("Cannot {} session '{}': {}", op, name, e);
                return ControlOutcome::ConfigError(e);
            }
        };

        let status = if status.state.is_idle() {
            status
        } else if op == ControlOperation::Start {
            info!(
                "Session '{}' is already {}, nothing to start",
                name, status.state
            );
            return ControlOutcome::Unchanged(status);
        } else {
            match self.stop_and_converge(name, status, cancel).await {
                ControlOutcome::Converged(status) => status,
                other => return other,
            }
        };

        if op == ControlOperation::Stop {
            return ControlOutcome::Converged(status);
        }

        let Some(target) = status.lro_target() else {
            error!("Cannot {} session '{}': no edge write token", op, name);
            return ControlOutcome::ConfigError(SessionError::NoEdgeSession(name.to_string()));
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return ControlOutcome::Cancelled(Some(status)),
            result = self.lro.start(&target) => result,
        };
        report_control_result("start", name, &result);

        self.converge(name, status, SessionState::Starting, cancel)
            .await
    }

    /// Send a stop to the LRO in `status` and wait for `terminated`.
    ///
    /// Callers hold the session lock.
    pub(crate) async fn stop_and_converge(
        &self,
        name: &str,
        status: SessionStatus,
        cancel: &CancellationToken,
    ) -> ControlOutcome {
        match (status.lro_target(), status.tlro.clone()) {
            (Some(target), Some(handle)) => {
                info!("Stopping LRO {} of '{}' ({})", handle, name, status.state);
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return ControlOutcome::Cancelled(Some(status)),
                    result = self.lro.stop(&target, &handle) => result,
                };
                report_control_result("stop", name, &result);
            }
            _ => warn!(
                "Session '{}' is {} but has no LRO handle to stop",
                name, status.state
            ),
        }

        self.converge(name, status, SessionState::Terminated, cancel)
            .await
    }

    async fn converge(
        &self,
        name: &str,
        initial: SessionStatus,
        target: SessionState,
        cancel: &CancellationToken,
    ) -> ControlOutcome {
        let resolver = self.resolver.as_ref();
        let result = poll_until(
            self.clock.as_ref(),
            &self.policy,
            cancel,
            move |_| resolver.resolve(name, false),
            |status: &SessionStatus| status.state == target,
        )
        .await;

        match result {
            PollResult::Reached { value, attempts } => {
                info!(
                    "Session '{}' reached {} after {} attempts",
                    name, target, attempts
                );
                ControlOutcome::Converged(value)
            }
            PollResult::Exhausted { last, attempts } => {
                let last = last.unwrap_or(initial);
                error!(
                    "Session '{}' did not reach {} after {} attempts, last state {}",
                    name, target, attempts, last.state
                );
                ControlOutcome::TimedOut(last)
            }
            PollResult::Cancelled { last, attempts } => {
                warn!(
                    "Session '{}' cancelled while waiting for {} after {} attempts",
                    name, target, attempts
                );
                ControlOutcome::Cancelled(Some(last.unwrap_or(initial)))
            }
        }
    }
}
