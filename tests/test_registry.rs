use std::sync::{Arc, Mutex};
use std::time::Duration;

use tidegate::server::{
    ConnectionId, ConnectionRegistry, ConnectionState, LifecycleObserver, TransitionEvent,
};

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<(ConnectionId, Option<ConnectionState>, ConnectionState, usize)>>,
}

impl LifecycleObserver for RecordingObserver {
    fn on_transition(&self, event: &TransitionEvent) {
        self.events.lock().unwrap().push((
            event.id,
            event.old_state,
            event.new_state,
            event.active,
        ));
    }
}

#[test]
fn test_count_tracks_new_and_closed() {
    let registry = ConnectionRegistry::new();

    for i in 1..=3 {
        registry.on_transition(ConnectionId(i), ConnectionState::New);
    }
    assert_eq!(registry.active_count(), 3);

    registry.on_transition(ConnectionId(1), ConnectionState::Closed);
    registry.on_transition(ConnectionId(2), ConnectionState::Closed);
    assert_eq!(registry.active_count(), 1);
}

#[test]
fn test_full_lifecycle_keeps_count_stable() {
    let registry = ConnectionRegistry::new();
    let id = ConnectionId(7);

    registry.on_transition(id, ConnectionState::New);
    assert_eq!(registry.state_of(id), Some(ConnectionState::New));

    registry.on_transition(id, ConnectionState::Active);
    registry.on_transition(id, ConnectionState::Idle);
    registry.on_transition(id, ConnectionState::Active);
    assert_eq!(registry.active_count(), 1);
    assert_eq!(registry.state_of(id), Some(ConnectionState::Active));

    registry.on_transition(id, ConnectionState::Closed);
    assert_eq!(registry.active_count(), 0);
    assert_eq!(registry.state_of(id), None);
}

#[test]
fn test_double_close_does_not_underflow() {
    let registry = ConnectionRegistry::new();
    let id = ConnectionId(1);

    registry.on_transition(id, ConnectionState::New);
    registry.on_transition(id, ConnectionState::Closed);
    registry.on_transition(id, ConnectionState::Closed);

    assert_eq!(registry.active_count(), 0);
}

#[test]
fn test_close_for_unknown_id_is_ignored() {
    let registry = ConnectionRegistry::new();

    registry.on_transition(ConnectionId(99), ConnectionState::Closed);

    assert_eq!(registry.active_count(), 0);
    assert!(registry.active_ids().is_empty());
}

#[test]
fn test_duplicate_new_is_ignored() {
    let registry = ConnectionRegistry::new();
    let id = ConnectionId(1);

    registry.on_transition(id, ConnectionState::New);
    registry.on_transition(id, ConnectionState::New);

    assert_eq!(registry.active_count(), 1);
}

#[test]
fn test_transition_for_unregistered_id_is_ignored() {
    let registry = ConnectionRegistry::new();

    registry.on_transition(ConnectionId(5), ConnectionState::Active);

    assert_eq!(registry.active_count(), 0);
    assert_eq!(registry.state_of(ConnectionId(5)), None);
}

#[test]
fn test_hijacked_connection_stays_counted() {
    let registry = ConnectionRegistry::new();
    let id = ConnectionId(3);

    registry.on_transition(id, ConnectionState::New);
    registry.on_transition(id, ConnectionState::Active);
    registry.on_transition(id, ConnectionState::Hijacked);

    // The connection left HTTP serving but its owner has not closed it yet.
    assert_eq!(registry.active_count(), 1);
    assert_eq!(registry.state_of(id), Some(ConnectionState::Hijacked));

    registry.on_transition(id, ConnectionState::Closed);
    assert_eq!(registry.active_count(), 0);
}

#[test]
fn test_observer_sees_ordered_events_with_counts() {
    let registry = ConnectionRegistry::new();
    let observer = Arc::new(RecordingObserver::default());
    registry.subscribe(observer.clone());

    let id = ConnectionId(1);
    registry.on_transition(id, ConnectionState::New);
    registry.on_transition(id, ConnectionState::Active);
    registry.on_transition(id, ConnectionState::Closed);

    let events = observer.events.lock().unwrap();
    assert_eq!(
        *events,
        vec![
            (id, None, ConnectionState::New, 1),
            (id, Some(ConnectionState::New), ConnectionState::Active, 1),
            (id, Some(ConnectionState::Active), ConnectionState::Closed, 0),
        ]
    );
}

#[test]
fn test_anomalous_reports_do_not_reach_observers() {
    let registry = ConnectionRegistry::new();
    let observer = Arc::new(RecordingObserver::default());
    registry.subscribe(observer.clone());

    registry.on_transition(ConnectionId(1), ConnectionState::Closed);
    registry.on_transition(ConnectionId(2), ConnectionState::Active);

    assert!(observer.events.lock().unwrap().is_empty());
}

#[test]
fn test_active_ids_sorted() {
    let registry = ConnectionRegistry::new();

    registry.on_transition(ConnectionId(3), ConnectionState::New);
    registry.on_transition(ConnectionId(1), ConnectionState::New);
    registry.on_transition(ConnectionId(2), ConnectionState::New);

    assert_eq!(
        registry.active_ids(),
        vec![ConnectionId(1), ConnectionId(2), ConnectionId(3)]
    );
}

#[test]
fn test_connection_id_display() {
    assert_eq!(ConnectionId(17).to_string(), "conn-17");
    assert_eq!(ConnectionState::Idle.to_string(), "idle");
}

#[tokio::test]
async fn test_drained_resolves_immediately_when_empty() {
    let registry = ConnectionRegistry::new();

    tokio::time::timeout(Duration::from_millis(100), registry.drained())
        .await
        .expect("drained should resolve for an empty registry");
}

#[tokio::test(start_paused = true)]
async fn test_drained_wakes_when_last_connection_closes() {
    let registry = Arc::new(ConnectionRegistry::new());
    let id = ConnectionId(1);
    registry.on_transition(id, ConnectionState::New);

    let reg = registry.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        reg.on_transition(id, ConnectionState::Closed);
    });

    tokio::time::timeout(Duration::from_secs(1), registry.drained())
        .await
        .expect("drained should wake once the count reaches zero");

    assert_eq!(registry.active_count(), 0);
}
