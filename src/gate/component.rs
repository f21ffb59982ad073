//! Session Gate wrapper
//!
//! Owns the protected children for one mount. Mounting spawns the
//! probe/recover sequence and the redirect effect; children are only handed
//! out once the session is verified.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::liveness::Liveness;
use super::machine::{drive, GateCell, GateStateMachine};
use super::redirect::{Navigator, RedirectPolicy};
use super::types::{GateSnapshot, GateStatus};
use crate::session::SessionProvider;

pub struct SessionGate<C> {
    mount_id: Uuid,
    children: C,
    state: watch::Receiver<GateSnapshot>,
    liveness: Liveness,
    task: Option<JoinHandle<()>>,
}

impl<C> SessionGate<C> {
    /// Spawns the gate's work on the current tokio runtime and returns at once.
    pub fn mount<P, N>(provider: P, redirect: RedirectPolicy<N>, children: C) -> Self
    where
        P: SessionProvider + 'static,
        N: Navigator + 'static,
    {
        let mount_id = Uuid::new_v4();
        let liveness = Liveness::new();
        let cell = GateCell::new();
        let state = cell.subscribe();

        info!(%mount_id, "Mounting session gate");

        let machine = GateStateMachine::new(provider, mount_id);
        let task_liveness = liveness.clone();
        let task = tokio::spawn(run_mount(machine, cell, redirect, task_liveness));

        Self {
            mount_id,
            children,
            state,
            liveness,
            task: Some(task),
        }
    }

    pub fn mount_id(&self) -> Uuid {
        self.mount_id
    }

    pub fn snapshot(&self) -> GateSnapshot {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<GateSnapshot> {
        self.state.clone()
    }

    pub fn is_checking(&self) -> bool {
        self.snapshot().is_checking
    }

    pub fn status(&self) -> GateStatus {
        self.snapshot().status
    }

    /// Children are rendered only under `authenticated_verified`; every other
    /// state renders nothing.
    pub fn render(&self) -> Option<&C> {
        let snapshot = self.snapshot();
        if !snapshot.is_checking && snapshot.status.permits_render() {
            Some(&self.children)
        } else {
            None
        }
    }

    /// Waits for the terminal status. Returns `Unknown` if the sequence ended
    /// without settling.
    pub async fn settled(&mut self) -> GateStatus {
        match self.state.wait_for(|s| !s.is_checking).await {
            Ok(snapshot) => snapshot.status,
            Err(_) => GateStatus::Unknown,
        }
    }

    /// Waits for the mount's sequence, including any redirect, to finish.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(mount_id = %self.mount_id, "Session gate task failed: {}", e);
            }
        }
    }

    /// Tears the gate down. The in-flight sequence may still finish its I/O but
    /// can no longer touch gate state or navigate.
    pub fn unmount(mut self) -> Option<JoinHandle<()>> {
        debug!(mount_id = %self.mount_id, "Unmounting session gate");
        self.liveness.revoke();
        self.task.take()
    }
}

impl<C> Drop for SessionGate<C> {
    fn drop(&mut self) {
        self.liveness.revoke();
    }
}

/// Probe, settle, then issue the redirect in the same turn so a settled
/// non-verified gate always navigates unless it was unmounted first.
async fn run_mount<P, N>(
    machine: GateStateMachine<P>,
    cell: GateCell,
    mut redirect: RedirectPolicy<N>,
    liveness: Liveness,
) where
    P: SessionProvider,
    N: Navigator,
{
    let mount_id = machine.mount_id();
    let Some(status) = drive(&machine, &cell, &liveness).await else {
        return;
    };
    match liveness.run_if_alive(|| redirect.apply(cell.snapshot())) {
        Some(Some(_)) => {}
        Some(None) => debug!(%mount_id, %status, "No redirect needed"),
        None => debug!(%mount_id, %status, "Gate unmounted before redirect, skipping"),
    }
}
