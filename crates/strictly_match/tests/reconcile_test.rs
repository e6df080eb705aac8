//! Tests for the local view and its reconciliation with the store.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use strictly_chess::{Color, Move, board_notation::STARTING_POSITION};
use strictly_match::{
    ControlAction, ControlReceipt, CreatedMatch, InMemoryAuthority, JoinedMatch, LocalMatch,
    MatchAuthority, MatchClient, MatchError, MatchErrorKind, MatchId, MatchResult, MoveReceipt,
    Participant, Reconciliation, SessionStatus, StatusSnapshot,
};
use tokio::sync::Notify;

fn alice() -> Participant {
    Participant::new("alice".to_string(), "Alice".to_string())
}

fn bob() -> Participant {
    Participant::new("bob".to_string(), "Bob".to_string())
}

fn mv(s: &str) -> Move {
    Move::parse(s).expect("valid move text")
}

async fn started() -> InMemoryAuthority {
    let store = InMemoryAuthority::new();
    store.create_match(alice()).await.expect("create");
    store.join_match(1, bob()).await.expect("join");
    store
}

/// Store wrapper that can fail or stall move submissions and polls.
#[derive(Debug, Default)]
struct Unreliable {
    inner: InMemoryAuthority,
    failing: AtomicBool,
    gate: Option<Arc<Notify>>,
    /// Mangle the board on accepted move receipts.
    garbled_receipts: AtomicBool,
    /// Hold fetched snapshots until `poll_gate` is notified.
    slow_polls: AtomicBool,
    polled: Notify,
    poll_gate: Notify,
}

#[async_trait]
impl MatchAuthority for Unreliable {
    async fn create_match(&self, host: Participant) -> MatchResult<CreatedMatch> {
        self.inner.create_match(host).await
    }

    async fn join_match(&self, match_id: MatchId, joiner: Participant) -> MatchResult<JoinedMatch> {
        self.inner.join_match(match_id, joiner).await
    }

    async fn submit_move(&self, match_id: MatchId, actor: &str, mv: Move) -> MatchResult<MoveReceipt> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(MatchError::new(
                MatchErrorKind::CollaboratorUnavailable,
                "connection refused",
            ));
        }
        let mut receipt = self.inner.submit_move(match_id, actor, mv).await?;
        if self.garbled_receipts.load(Ordering::SeqCst) {
            receipt.board_notation = "not a board".to_string();
        }
        Ok(receipt)
    }

    async fn get_status(&self, match_id: MatchId) -> MatchResult<StatusSnapshot> {
        let snapshot = self.inner.get_status(match_id).await?;
        if self.slow_polls.load(Ordering::SeqCst) {
            self.polled.notify_one();
            self.poll_gate.notified().await;
        }
        Ok(snapshot)
    }

    async fn control_action(
        &self,
        match_id: MatchId,
        actor: &str,
        action: ControlAction,
    ) -> MatchResult<ControlReceipt> {
        self.inner.control_action(match_id, actor, action).await
    }
}

// ─────────────────────────────────────────────────────────────
//  LocalMatch::reconcile
// ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_opponent_move_is_detected_once() {
    let store = started().await;
    let mut local =
        LocalMatch::from_snapshot("bob", &store.get_status(1).await.expect("status")).expect("view");
    assert_eq!(local.color(), Color::Black);

    store.submit_move(1, "alice", mv("e2e4")).await.expect("submit");
    let snapshot = store.get_status(1).await.expect("status");

    let change = local.reconcile(&snapshot).expect("reconcile");
    let Reconciliation::BoardChanged {
        opponent_move,
        your_turn,
    } = change
    else {
        panic!("expected board change, got {change:?}");
    };
    assert!(your_turn);
    assert_eq!(opponent_move.expect("identified").mv, mv("e2e4"));
    assert_eq!(local.history().len(), 1);

    let settled = local.clone();
    assert_eq!(
        local.reconcile(&snapshot).expect("reconcile"),
        Reconciliation::Unchanged
    );
    assert_eq!(local, settled);
}

#[tokio::test]
async fn test_status_change_is_adopted() {
    let store = started().await;
    let mut local =
        LocalMatch::from_snapshot("alice", &store.get_status(1).await.expect("status")).expect("view");

    store
        .control_action(1, "bob", ControlAction::Pause)
        .await
        .expect("pause");
    let change = local
        .reconcile(&store.get_status(1).await.expect("status"))
        .expect("reconcile");
    assert_eq!(
        change,
        Reconciliation::StatusChanged {
            from: SessionStatus::Playing,
            to: SessionStatus::Paused,
        }
    );
    assert!(!local.is_my_turn());
}

#[tokio::test]
async fn test_rematch_replaces_local_match() {
    let store = started().await;
    let mut local =
        LocalMatch::from_snapshot("alice", &store.get_status(1).await.expect("status")).expect("view");
    store.submit_move(1, "alice", mv("e2e4")).await.expect("submit");
    local
        .reconcile(&store.get_status(1).await.expect("status"))
        .expect("reconcile");
    assert_eq!(local.color(), Color::White);

    store.control_action(1, "bob", ControlAction::Surrender).await.expect("surrender");
    store.control_action(1, "bob", ControlAction::RematchOffer).await.expect("offer");
    let receipt = store
        .control_action(1, "alice", ControlAction::RematchAccept)
        .await
        .expect("accept");
    let new_id = receipt.new_match_id.expect("new match");

    let snapshot = store.get_status(new_id).await.expect("status");
    let change = local.reconcile(&snapshot).expect("reconcile");
    assert_eq!(
        change,
        Reconciliation::Rematched {
            new_id,
            color: Color::Black,
        }
    );
    assert_eq!(local.session().id, new_id);
    assert_eq!(local.notation(), STARTING_POSITION);
    assert!(local.history().is_empty());
    assert!(!local.is_my_turn());

    assert_eq!(
        local.reconcile(&snapshot).expect("reconcile"),
        Reconciliation::Unchanged
    );
}

#[tokio::test]
async fn test_foreign_snapshot_is_stale() {
    let store = started().await;
    let mut local =
        LocalMatch::from_snapshot("alice", &store.get_status(1).await.expect("status")).expect("view");
    let before = local.clone();

    let other = store
        .create_match(Participant::new("carol".to_string(), "Carol".to_string()))
        .await
        .expect("create");
    let err = local
        .reconcile(&store.get_status(other.match_id).await.expect("status"))
        .unwrap_err();
    assert_eq!(err.kind, MatchErrorKind::StaleSnapshot);
    assert_eq!(local, before);
}

#[tokio::test]
async fn test_corrupt_snapshot_leaves_view_untouched() {
    let store = started().await;
    let mut local =
        LocalMatch::from_snapshot("alice", &store.get_status(1).await.expect("status")).expect("view");
    let before = local.clone();

    let mut snapshot = store.get_status(1).await.expect("status");
    snapshot.board_notation = "8/8/8/8/8/8/8/8 w - - 0 1".to_string();
    let err = local.reconcile(&snapshot).unwrap_err();
    assert_eq!(err.kind, MatchErrorKind::CorruptSnapshot);
    assert_eq!(local, before);
}

// ─────────────────────────────────────────────────────────────
//  MatchClient
// ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_two_clients_stay_in_step() {
    let store: Arc<dyn MatchAuthority> = Arc::new(InMemoryAuthority::new());
    let white = MatchClient::host(store.clone(), alice()).await.expect("host");
    let match_id = white.match_id().await;
    let black = MatchClient::join(store.clone(), match_id, bob()).await.expect("join");

    assert_eq!(
        white.refresh().await.expect("refresh"),
        Reconciliation::StatusChanged {
            from: SessionStatus::Waiting,
            to: SessionStatus::Playing,
        }
    );

    white.submit_move(mv("e2e4")).await.expect("white moves");
    assert!(!white.view().await.is_my_turn());

    let err = white.submit_move(mv("d2d4")).await.unwrap_err();
    assert_eq!(err.kind, MatchErrorKind::NotYourTurn);

    black.refresh().await.expect("refresh");
    black.submit_move(mv("e7e5")).await.expect("black moves");
    white.refresh().await.expect("refresh");

    let white_view = white.view().await;
    let black_view = black.view().await;
    assert_eq!(white_view.notation(), black_view.notation());
    assert_eq!(white_view.session(), black_view.session());
    assert_eq!(white_view.history().len(), 2);
    assert!(white_view.is_my_turn());
}

#[tokio::test]
async fn test_collaborator_failure_rolls_back() {
    let store = Arc::new(Unreliable::default());
    store.inner.create_match(alice()).await.expect("create");
    store.inner.join_match(1, bob()).await.expect("join");
    let client = MatchClient::attach(store.clone(), "alice", 1).await.expect("attach");
    let before = client.view().await;

    store.failing.store(true, Ordering::SeqCst);
    let err = client.submit_move(mv("e2e4")).await.unwrap_err();
    assert_eq!(err.kind, MatchErrorKind::CollaboratorUnavailable);
    assert_eq!(client.view().await, before);

    store.failing.store(false, Ordering::SeqCst);
    let receipt = client.submit_move(mv("e2e4")).await.expect("retry");
    assert!(receipt.accepted);
}

#[tokio::test]
async fn test_second_submission_while_in_flight_is_rejected() {
    let gate = Arc::new(Notify::new());
    let store = Arc::new(Unreliable {
        gate: Some(gate.clone()),
        ..Unreliable::default()
    });
    store.inner.create_match(alice()).await.expect("create");
    store.inner.join_match(1, bob()).await.expect("join");
    let client = MatchClient::attach(store.clone(), "alice", 1).await.expect("attach");

    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.submit_move(mv("e2e4")).await }
    });
    while !client.view().await.in_flight() {
        tokio::task::yield_now().await;
    }

    let err = client.submit_move(mv("d2d4")).await.unwrap_err();
    assert_eq!(err.kind, MatchErrorKind::MoveInFlight);
    assert_eq!(
        client.refresh().await.expect("refresh"),
        Reconciliation::Skipped
    );

    gate.notify_one();
    let receipt = pending.await.expect("task").expect("submit");
    assert!(receipt.accepted);
    assert!(!client.view().await.in_flight());
}

#[tokio::test]
async fn test_draw_offer_reaches_opponent() {
    let store: Arc<dyn MatchAuthority> = Arc::new(started().await);
    let white = MatchClient::attach(store.clone(), "alice", 1).await.expect("attach");
    let black = MatchClient::attach(store.clone(), "bob", 1).await.expect("attach");

    white.control(ControlAction::DrawOffer).await.expect("offer");
    assert_eq!(black.refresh().await.expect("refresh"), Reconciliation::SessionUpdated);
    assert_eq!(black.view().await.session().draw_offer(), Some(Color::White));

    let err = white.control(ControlAction::DrawAccept).await.unwrap_err();
    assert_eq!(err.kind, MatchErrorKind::InvalidTransition);

    black.control(ControlAction::DrawAccept).await.expect("accept");
    assert_eq!(black.view().await.session().status(), SessionStatus::Finished);
}

#[tokio::test]
async fn test_clients_follow_rematch() {
    let store: Arc<dyn MatchAuthority> = Arc::new(started().await);
    let white = MatchClient::attach(store.clone(), "alice", 1).await.expect("attach");
    let black = MatchClient::attach(store.clone(), "bob", 1).await.expect("attach");

    black.control(ControlAction::Surrender).await.expect("surrender");
    black.control(ControlAction::RematchOffer).await.expect("offer");
    white.refresh().await.expect("refresh");
    white.control(ControlAction::RematchAccept).await.expect("accept");

    let new_id = white.match_id().await;
    assert_ne!(new_id, 1);
    assert_eq!(white.view().await.color(), Color::Black);

    assert_eq!(
        black.refresh().await.expect("refresh"),
        Reconciliation::Rematched {
            new_id,
            color: Color::White,
        }
    );
    black.submit_move(mv("d2d4")).await.expect("new white moves first");
}

#[tokio::test]
async fn test_poll_fetched_before_local_move_is_skipped() {
    let store = Arc::new(Unreliable::default());
    store.inner.create_match(alice()).await.expect("create");
    store.inner.join_match(1, bob()).await.expect("join");
    let client = MatchClient::attach(store.clone(), "alice", 1).await.expect("attach");

    store.slow_polls.store(true, Ordering::SeqCst);
    let poll = tokio::spawn({
        let client = client.clone();
        async move { client.refresh().await }
    });
    store.polled.notified().await;

    client.submit_move(mv("e2e4")).await.expect("submit");
    let moved = client.view().await;
    assert!(!moved.is_my_turn());

    store.poll_gate.notify_one();
    let change = poll.await.expect("task").expect("refresh");
    assert_eq!(change, Reconciliation::Skipped);
    assert_eq!(client.view().await, moved);

    store.slow_polls.store(false, Ordering::SeqCst);
    client.refresh().await.expect("refresh");
    let view = client.view().await;
    assert_eq!(
        view.notation(),
        store.inner.get_status(1).await.expect("status").board_notation
    );
    assert_eq!(view.history().len(), 1);
    assert!(!view.is_my_turn());
}

#[tokio::test]
async fn test_unreadable_receipt_keeps_accepted_move() {
    let store = Arc::new(Unreliable::default());
    store.inner.create_match(alice()).await.expect("create");
    store.inner.join_match(1, bob()).await.expect("join");
    let client = MatchClient::attach(store.clone(), "alice", 1).await.expect("attach");

    store.garbled_receipts.store(true, Ordering::SeqCst);
    let receipt = client.submit_move(mv("e2e4")).await.expect("accepted");
    assert!(receipt.accepted);

    let view = client.view().await;
    assert_eq!(view.history().len(), 1);
    assert!(!view.is_my_turn());
    assert_eq!(
        view.notation(),
        store.inner.get_status(1).await.expect("status").board_notation
    );
}

#[tokio::test]
async fn test_view_carries_clock_readings() {
    let store = started().await;
    let mut local =
        LocalMatch::from_snapshot("bob", &store.get_status(1).await.expect("status")).expect("view");
    assert!(local.remaining(Color::White).is_some());

    let snapshot = store.get_status(1).await.expect("status");
    local.reconcile(&snapshot).expect("reconcile");
    assert_eq!(local.remaining(Color::Black), snapshot.remaining(Color::Black));
}
