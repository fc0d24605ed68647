//! Connection lifecycle tracking
//!
//! This module keeps the count and state ledger of live connections. The
//! connection driver reports every transport-level state change; the registry
//! never infers transitions on its own. The shutdown coordinator waits on the
//! registry to know when the last connection has gone away.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use tokio::sync::Notify;
use tracing::warn;

use crate::server::shutdown::ShutdownOutcome;

/// Stable identity of one transport connection, assigned at accept time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Lifecycle phase of a transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, nothing exchanged yet
    New,
    /// Reading or serving a request
    Active,
    /// Parked between keep-alive requests
    Idle,
    /// Taken over by its handler; counted until the new owner reports Closed
    Hijacked,
    /// Terminal
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::New => "new",
            ConnectionState::Active => "active",
            ConnectionState::Idle => "idle",
            ConnectionState::Hijacked => "hijacked",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostics record handed to observers on every accepted transition.
#[derive(Debug, Clone)]
pub struct TransitionEvent {
    pub id: ConnectionId,
    /// Previous recorded state; `None` when the connection enters as `New`.
    pub old_state: Option<ConnectionState>,
    pub new_state: ConnectionState,
    /// Number of open connections after this transition.
    pub active: usize,
    pub at: Instant,
}

/// Subscriber interface for connection lifecycle diagnostics.
///
/// Observers are invoked after the registry's internal lock is released and
/// must not block; anything slow belongs on the observer's own task.
pub trait LifecycleObserver: Send + Sync {
    /// Called after every accepted state transition.
    fn on_transition(&self, event: &TransitionEvent);

    /// Called once with the final shutdown outcome.
    fn on_shutdown(&self, _outcome: &ShutdownOutcome) {}
}

/// Built-in observer that renders lifecycle events through `tracing`.
#[derive(Debug, Default)]
pub struct LogObserver;

impl LifecycleObserver for LogObserver {
    fn on_transition(&self, event: &TransitionEvent) {
        tracing::info!(
            conn = %event.id,
            state = %event.new_state,
            open = event.active,
            "Connection state changed"
        );
    }

    fn on_shutdown(&self, outcome: &ShutdownOutcome) {
        match outcome {
            ShutdownOutcome::Drained => {
                tracing::info!("Shutdown complete: all connections drained");
            }
            ShutdownOutcome::TimedOut { forced } => {
                tracing::warn!(
                    forced = forced.len(),
                    "Shutdown complete: grace period expired"
                );
            }
        }
    }
}

/// Count and state ledger of live connections.
///
/// The count covers every connection not yet in `Closed`: it increments
/// exactly once when a connection reports `New` and decrements exactly once
/// when it reports `Closed`. Unbalanced reports are a transport contract
/// violation; the registry logs them and leaves the count untouched rather
/// than panicking, and the decrement saturates at zero.
pub struct ConnectionRegistry {
    active: AtomicUsize,
    ledger: Mutex<HashMap<ConnectionId, ConnectionState>>,
    observers: RwLock<Vec<Arc<dyn LifecycleObserver>>>,
    drained: Notify,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            active: AtomicUsize::new(0),
            ledger: Mutex::new(HashMap::new()),
            observers: RwLock::new(Vec::new()),
            drained: Notify::new(),
        }
    }

    /// Appends a lifecycle observer.
    pub fn subscribe(&self, observer: Arc<dyn LifecycleObserver>) {
        self.observers
            .write()
            .expect("observer list poisoned")
            .push(observer);
    }

    /// Records a transport-reported state change.
    ///
    /// Fire-and-forget: updates the ledger and count, then emits a
    /// [`TransitionEvent`] to every observer. The ledger lock is held only
    /// for the map update, never across observer callbacks.
    ///
    /// Anomalous reports (`New` for a live id, any transition for an unknown
    /// id, `Closed` twice) are logged and otherwise ignored.
    pub fn on_transition(&self, id: ConnectionId, new_state: ConnectionState) {
        let (old_state, active) = {
            let mut ledger = self.ledger.lock().expect("connection ledger poisoned");

            match new_state {
                ConnectionState::New => {
                    if ledger.contains_key(&id) {
                        drop(ledger);
                        warn!(conn = %id, "Duplicate New report for live connection");
                        return;
                    }
                    ledger.insert(id, ConnectionState::New);
                    let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                    (None, active)
                }
                ConnectionState::Closed => {
                    let Some(old) = ledger.remove(&id) else {
                        drop(ledger);
                        warn!(conn = %id, "Closed report for unknown or closed connection");
                        return;
                    };
                    let prev = self
                        .active
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                            Some(n.saturating_sub(1))
                        })
                        .unwrap_or_default();
                    if prev == 0 {
                        warn!(conn = %id, "Connection count underflow suppressed");
                    }
                    (Some(old), prev.saturating_sub(1))
                }
                other => {
                    let Some(slot) = ledger.get_mut(&id) else {
                        drop(ledger);
                        warn!(conn = %id, state = %other, "Transition report for unknown connection");
                        return;
                    };
                    let old = *slot;
                    *slot = other;
                    (Some(old), self.active.load(Ordering::SeqCst))
                }
            }
        };

        if new_state == ConnectionState::Closed && active == 0 {
            self.drained.notify_waiters();
        }

        tracing::debug!(
            conn = %id,
            from = old_state.map(|s| s.as_str()).unwrap_or("-"),
            to = %new_state,
            open = active,
            "Connection transition"
        );

        let event = TransitionEvent {
            id,
            old_state,
            new_state,
            active,
            at: Instant::now(),
        };
        for observer in self.observer_snapshot() {
            observer.on_transition(&event);
        }
    }

    /// Current number of connections not in `Closed`.
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Snapshot of live connection ids, sorted for stable reporting.
    pub fn active_ids(&self) -> Vec<ConnectionId> {
        let ledger = self.ledger.lock().expect("connection ledger poisoned");
        let mut ids: Vec<ConnectionId> = ledger.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Last reported state of a connection, if it is still live.
    pub fn state_of(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.ledger
            .lock()
            .expect("connection ledger poisoned")
            .get(&id)
            .copied()
    }

    /// Resolves once the active count reaches zero.
    ///
    /// Registers for notification before checking the count, so a `Closed`
    /// report racing with this call cannot be missed.
    pub async fn drained(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.active_count() == 0 {
                return;
            }

            notified.await;
        }
    }

    pub(crate) fn emit_shutdown(&self, outcome: &ShutdownOutcome) {
        for observer in self.observer_snapshot() {
            observer.on_shutdown(outcome);
        }
    }

    fn observer_snapshot(&self) -> Vec<Arc<dyn LifecycleObserver>> {
        self.observers
            .read()
            .expect("observer list poisoned")
            .clone()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
