//! Tests for the reconciliation poller, on a paused clock.

use std::sync::Arc;
use std::time::Duration;
use strictly_chess::Move;
use strictly_match::{
    ControlAction, InMemoryAuthority, MatchAuthority, MatchClient, Participant, Reconciliation,
    ReconciliationPoller, SessionStatus, SyncEvent,
};

const INTERVAL: Duration = Duration::from_millis(2000);

async fn started() -> Arc<InMemoryAuthority> {
    let store = Arc::new(InMemoryAuthority::new());
    store
        .create_match(Participant::new("alice".to_string(), "Alice".to_string()))
        .await
        .expect("create");
    store
        .join_match(1, Participant::new("bob".to_string(), "Bob".to_string()))
        .await
        .expect("join");
    store
}

#[tokio::test(start_paused = true)]
async fn test_poller_reports_opponent_move_then_stops_at_finish() {
    let store = started().await;
    let black = MatchClient::attach(store.clone(), "bob", 1).await.expect("attach");
    let (handle, mut events) = ReconciliationPoller::spawn(black.clone(), INTERVAL);

    store
        .submit_move(1, "alice", Move::parse("e2e4").expect("move"))
        .await
        .expect("submit");

    match events.recv().await.expect("event") {
        SyncEvent::Reconciled(Reconciliation::BoardChanged {
            opponent_move,
            your_turn,
        }) => {
            assert!(your_turn);
            assert!(opponent_move.is_some());
        }
        other => panic!("expected board change, got {other:?}"),
    }

    store
        .control_action(1, "alice", ControlAction::Surrender)
        .await
        .expect("surrender");

    match events.recv().await.expect("event") {
        SyncEvent::Reconciled(Reconciliation::StatusChanged { to, .. }) => {
            assert_eq!(to, SessionStatus::Finished);
        }
        other => panic!("expected status change, got {other:?}"),
    }
    assert!(matches!(events.recv().await, Some(SyncEvent::Stopped)));
    assert!(events.recv().await.is_none());
    handle.join().await;
}

#[tokio::test(start_paused = true)]
async fn test_poller_keeps_running_while_rematch_offered() {
    let store = started().await;
    let white = MatchClient::attach(store.clone(), "alice", 1).await.expect("attach");
    let black = MatchClient::attach(store.clone(), "bob", 1).await.expect("attach");
    black.control(ControlAction::Surrender).await.expect("surrender");
    black.control(ControlAction::RematchOffer).await.expect("offer");
    let (handle, mut events) = ReconciliationPoller::spawn(white.clone(), INTERVAL);

    match events.recv().await.expect("event") {
        SyncEvent::Reconciled(Reconciliation::StatusChanged { to, .. }) => {
            assert_eq!(to, SessionStatus::Finished);
        }
        other => panic!("expected status change, got {other:?}"),
    }
    assert!(white.view().await.session().rematch_offer().is_some());

    tokio::time::sleep(INTERVAL * 2).await;
    assert!(!handle.is_finished());

    white
        .control(ControlAction::RematchAccept)
        .await
        .expect("accept");
    assert_ne!(white.match_id().await, 1);

    tokio::time::sleep(INTERVAL * 3).await;
    assert!(!handle.is_finished());
    assert_eq!(
        white.view().await.session().status(),
        SessionStatus::Playing
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_poller_ends() {
    let store = started().await;
    let client = MatchClient::attach(store, "alice", 1).await.expect("attach");
    let (handle, mut events) = ReconciliationPoller::spawn(client, INTERVAL);

    tokio::time::sleep(INTERVAL * 2).await;
    handle.cancel();
    handle.join().await;
    assert!(events.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_stops_poller() {
    let store = started().await;
    let client = MatchClient::attach(store, "alice", 1).await.expect("attach");
    let (handle, mut events) = ReconciliationPoller::spawn(client, INTERVAL);

    drop(handle);
    assert!(events.recv().await.is_none());
}
