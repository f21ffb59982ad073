use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::liveness::Liveness;
use super::types::{GateSnapshot, GateStatus, SessionProbeResult};
use crate::session::SessionProvider;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("Gate already settled as {0}")]
    AlreadySettled(GateStatus),

    #[error("Cannot settle gate to non-terminal status {0}")]
    NotTerminal(GateStatus),
}

// ============================================================================
// State cell
// ============================================================================

/// Holds `{ isChecking, authStatus }` for one mount. The only mutation is
/// `settle`, which moves `unknown` to a terminal status exactly once.
pub struct GateCell {
    tx: watch::Sender<GateSnapshot>,
}

impl GateCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(GateSnapshot::checking());
        Self { tx }
    }

    pub fn snapshot(&self) -> GateSnapshot {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<GateSnapshot> {
        self.tx.subscribe()
    }

    pub fn settle(&self, status: GateStatus) -> Result<(), GateError> {
        if !status.is_terminal() {
            return Err(GateError::NotTerminal(status));
        }

        let mut outcome = Ok(());
        self.tx.send_if_modified(|snapshot| {
            if snapshot.status.is_terminal() {
                outcome = Err(GateError::AlreadySettled(snapshot.status));
                return false;
            }
            snapshot.status = status;
            snapshot.is_checking = false;
            true
        });
        outcome
    }
}

impl Default for GateCell {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Probe / recover protocol
// ============================================================================

pub struct GateStateMachine<P> {
    provider: P,
    mount_id: Uuid,
}

impl<P: SessionProvider> GateStateMachine<P> {
    pub fn new(provider: P, mount_id: Uuid) -> Self {
        Self { provider, mount_id }
    }

    pub fn mount_id(&self) -> Uuid {
        self.mount_id
    }

    /// Probe, and on a 401/403 refresh once and probe once more. Every path
    /// ends in a terminal status; no error escapes.
    pub async fn resolve(&self) -> GateStatus {
        let mount_id = self.mount_id;
        debug!(%mount_id, "Probing current session");

        let err = match self.provider.get_current_session().await {
            Ok(result) => return self.classify(&result, "probe"),
            Err(err) => err,
        };

        if !err.is_recoverable() {
            warn!(%mount_id, error = %err, "Session probe failed, not recoverable");
            return GateStatus::Unauthenticated;
        }

        info!(
            %mount_id,
            status = ?err.status(),
            "Session probe rejected, attempting one token refresh"
        );

        if let Err(err) = self.provider.refresh_token().await {
            warn!(%mount_id, error = %err, "Token refresh failed");
            return GateStatus::Unauthenticated;
        }

        match self.provider.get_current_session().await {
            Ok(result) => self.classify(&result, "retry"),
            Err(err) => {
                warn!(%mount_id, error = %err, "Session probe failed after refresh");
                GateStatus::Unauthenticated
            }
        }
    }

    fn classify(&self, result: &SessionProbeResult, stage: &str) -> GateStatus {
        let status = result.to_status();
        debug!(
            mount_id = %self.mount_id,
            stage,
            auth_state = ?result.auth_state,
            "Session probe succeeded"
        );
        status
    }
}

/// Runs the protocol and settles `cell` unless the mount has gone away. The
/// liveness check and the settle happen under one guard.
/// Returns the status that was applied, or `None` if the result was discarded.
pub async fn drive<P: SessionProvider>(
    machine: &GateStateMachine<P>,
    cell: &GateCell,
    liveness: &Liveness,
) -> Option<GateStatus> {
    let status = machine.resolve().await;
    let mount_id = machine.mount_id();

    match liveness.run_if_alive(|| cell.settle(status)) {
        None => {
            debug!(%mount_id, %status, "Gate unmounted before probe settled, discarding");
            None
        }
        Some(Ok(())) => {
            info!(%mount_id, %status, "Session gate settled");
            Some(status)
        }
        Some(Err(err)) => {
            warn!(%mount_id, error = %err, "Ignoring gate transition");
            None
        }
    }
}
