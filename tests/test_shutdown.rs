use std::sync::{Arc, Mutex};
use std::time::Duration;

use tidegate::server::{
    ConnectionId, ConnectionRegistry, ConnectionState, LifecycleObserver, Phase,
    ShutdownCoordinator, ShutdownOutcome, TransitionEvent,
};

#[derive(Default)]
struct OutcomeObserver {
    outcome: Mutex<Option<ShutdownOutcome>>,
}

impl LifecycleObserver for OutcomeObserver {
    fn on_transition(&self, _event: &TransitionEvent) {}

    fn on_shutdown(&self, outcome: &ShutdownOutcome) {
        *self.outcome.lock().unwrap() = Some(outcome.clone());
    }
}

fn coordinator() -> (Arc<ConnectionRegistry>, ShutdownCoordinator) {
    let registry = Arc::new(ConnectionRegistry::new());
    let coordinator = ShutdownCoordinator::new(registry.clone());
    (registry, coordinator)
}

#[test]
fn test_trigger_is_idempotent() {
    let (_registry, coordinator) = coordinator();

    assert_eq!(coordinator.phase(), Phase::Running);
    assert!(coordinator.trigger());
    assert!(!coordinator.trigger());
    assert_eq!(coordinator.phase(), Phase::Draining);
    assert!(coordinator.is_draining());
}

#[tokio::test]
async fn test_triggered_wakes_waiters() {
    let (_registry, coordinator) = coordinator();
    let coordinator = Arc::new(coordinator);

    let waiter = coordinator.clone();
    let task = tokio::spawn(async move { waiter.triggered().await });

    coordinator.trigger();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("waiter should wake after trigger")
        .unwrap();
}

#[tokio::test]
async fn test_triggered_resolves_if_already_draining() {
    let (_registry, coordinator) = coordinator();
    coordinator.trigger();

    tokio::time::timeout(Duration::from_millis(100), coordinator.triggered())
        .await
        .expect("triggered should resolve once draining has begun");
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_with_no_connections_drains_immediately() {
    let (_registry, coordinator) = coordinator();

    // No prior trigger(); await_shutdown begins the drain itself.
    assert_eq!(coordinator.phase(), Phase::Running);
    let outcome = coordinator.await_shutdown(Duration::from_secs(5)).await;

    assert_eq!(outcome, ShutdownOutcome::Drained);
    assert_eq!(coordinator.phase(), Phase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_drain_completes_when_work_finishes_inside_grace() {
    let (registry, coordinator) = coordinator();
    let id = ConnectionId(1);
    registry.on_transition(id, ConnectionState::New);
    registry.on_transition(id, ConnectionState::Active);

    let reg = registry.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        reg.on_transition(id, ConnectionState::Closed);
    });

    let outcome = coordinator.await_shutdown(Duration::from_secs(5)).await;

    assert_eq!(outcome, ShutdownOutcome::Drained);
    assert_eq!(registry.active_count(), 0);
    assert_eq!(coordinator.phase(), Phase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_grace_expiry_reports_forced_connections() {
    let (registry, coordinator) = coordinator();
    let slow = ConnectionId(1);
    let slower = ConnectionId(2);
    registry.on_transition(slow, ConnectionState::New);
    registry.on_transition(slower, ConnectionState::New);

    let reg = registry.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        reg.on_transition(slow, ConnectionState::Closed);
        reg.on_transition(slower, ConnectionState::Closed);
    });

    let outcome = coordinator.await_shutdown(Duration::from_secs(2)).await;

    match outcome {
        ShutdownOutcome::TimedOut { forced } => {
            assert_eq!(forced, vec![slow, slower]);
        }
        other => panic!("expected timed-out outcome, got {other:?}"),
    }
    assert_eq!(coordinator.phase(), Phase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_force_closed_fires_after_grace_expiry() {
    let (registry, coordinator) = coordinator();
    let coordinator = Arc::new(coordinator);
    registry.on_transition(ConnectionId(1), ConnectionState::New);

    let watcher = coordinator.clone();
    let task = tokio::spawn(async move { watcher.force_closed().await });

    coordinator.await_shutdown(Duration::from_millis(100)).await;

    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("force_closed should fire once the grace period expires")
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_observers_receive_shutdown_outcome() {
    let (registry, coordinator) = coordinator();
    let observer = Arc::new(OutcomeObserver::default());
    registry.subscribe(observer.clone());

    let outcome = coordinator.await_shutdown(Duration::from_secs(1)).await;

    assert_eq!(outcome, ShutdownOutcome::Drained);
    assert_eq!(*observer.outcome.lock().unwrap(), Some(ShutdownOutcome::Drained));
}

#[tokio::test(start_paused = true)]
async fn test_trigger_after_stop_returns_false() {
    let (_registry, coordinator) = coordinator();

    coordinator.await_shutdown(Duration::from_millis(10)).await;

    assert_eq!(coordinator.phase(), Phase::Stopped);
    assert!(!coordinator.trigger());
}
