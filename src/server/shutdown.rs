//! Graceful shutdown coordination
//!
//! The coordinator owns the server's shutdown phase: Running, then Draining
//! once the trigger fires, then Stopped. Draining stops the accept loop and
//! wakes idle connections; Stopped fires the force-close signal that aborts
//! whatever the grace period could not drain.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::server::registry::{ConnectionId, ConnectionRegistry};

const RUNNING: u8 = 0;
const DRAINING: u8 = 1;
const STOPPED: u8 = 2;

/// Shutdown phase of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Draining,
    Stopped,
}

/// How a shutdown sequence ended.
///
/// `TimedOut` is not a process failure; it reports that the grace period was
/// not enough and forced closure was required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every connection closed within the grace period.
    Drained,
    /// The grace period expired; the listed connections were force-closed.
    TimedOut { forced: Vec<ConnectionId> },
}

/// Single-fire drain trigger plus the wait-for-drain state machine.
pub struct ShutdownCoordinator {
    phase: AtomicU8,
    registry: Arc<ConnectionRegistry>,
    drain_started: Notify,
    force_close: Notify,
}

impl ShutdownCoordinator {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            phase: AtomicU8::new(RUNNING),
            registry,
            drain_started: Notify::new(),
            force_close: Notify::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        match self.phase.load(Ordering::SeqCst) {
            RUNNING => Phase::Running,
            DRAINING => Phase::Draining,
            _ => Phase::Stopped,
        }
    }

    /// True once draining has begun, including after the stop completes.
    pub fn is_draining(&self) -> bool {
        self.phase.load(Ordering::SeqCst) != RUNNING
    }

    /// Flips Running → Draining exactly once.
    ///
    /// Returns whether this call performed the transition; later calls are
    /// no-ops. The first call wakes the accept loop and idle connections.
    pub fn trigger(&self) -> bool {
        let flipped = self
            .phase
            .compare_exchange(RUNNING, DRAINING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();

        if flipped {
            info!("Draining started: refusing new connections");
            self.drain_started.notify_waiters();
        }
        flipped
    }

    /// Resolves once draining has begun.
    ///
    /// The accept loop races `accept()` against this; idle connections race
    /// their next read against it so a drain does not wait out keep-alive
    /// timeouts.
    pub async fn triggered(&self) {
        let notified = self.drain_started.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.phase.load(Ordering::SeqCst) != RUNNING {
            return;
        }

        notified.await;
    }

    /// Resolves once the grace period has expired and force-close is in
    /// effect. Connection drivers race in-flight work against this.
    pub async fn force_closed(&self) {
        let notified = self.force_close.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.phase.load(Ordering::SeqCst) == STOPPED {
            return;
        }

        notified.await;
    }

    /// Waits out the drain and reports how it ended.
    ///
    /// Triggers draining if nothing has yet, then waits for the registry to
    /// empty, bounded by the grace deadline. On expiry the surviving
    /// connection ids are logged as force-terminated and the force-close
    /// signal fires. Either way the coordinator ends Stopped and observers
    /// receive the outcome.
    pub async fn await_shutdown(&self, grace: Duration) -> ShutdownOutcome {
        self.trigger();

        let outcome = match tokio::time::timeout(grace, self.registry.drained()).await {
            Ok(()) => {
                info!("Drain complete: all connections closed");
                ShutdownOutcome::Drained
            }
            Err(_) => {
                let forced = self.registry.active_ids();
                let ids: Vec<String> = forced.iter().map(ToString::to_string).collect();
                warn!(
                    remaining = forced.len(),
                    connections = %ids.join(", "),
                    "Grace period expired: force-closing remaining connections"
                );
                ShutdownOutcome::TimedOut { forced }
            }
        };

        self.phase.store(STOPPED, Ordering::SeqCst);
        self.force_close.notify_waiters();
        self.registry.emit_shutdown(&outcome);

        outcome
    }
}
