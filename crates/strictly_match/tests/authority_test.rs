//! Tests for the in-memory authoritative store.

use std::sync::Arc;
use strictly_chess::{Color, Move, board_notation::STARTING_POSITION};
use strictly_match::{
    AUTOMATED_PLAYER_ID, ControlAction, FirstLegalMove, InMemoryAuthority, MatchAuthority,
    MatchErrorKind, Participant, SessionStatus,
};

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
    let created = store.create_match(alice()).await.expect("create");
    assert_eq!(created.match_id, 1);
    store.join_match(1, bob()).await.expect("join");
    store
}

#[tokio::test]
async fn test_create_and_join() {
    let store = InMemoryAuthority::new();
    let created = store.create_match(alice()).await.expect("create");
    assert_eq!(created.board_notation, STARTING_POSITION);
    assert_eq!(created.color, Color::White);

    let waiting = store.get_status(created.match_id).await.expect("status");
    assert_eq!(waiting.status, SessionStatus::Waiting);
    assert_eq!(waiting.turn, None);

    let joined = store.join_match(created.match_id, bob()).await.expect("join");
    assert_eq!(joined.color, Color::Black);

    let playing = store.get_status(created.match_id).await.expect("status");
    assert_eq!(playing.status, SessionStatus::Playing);
    assert_eq!(playing.turn, Some(Color::White));

    let err = store
        .join_match(created.match_id, Participant::new("carol".to_string(), "Carol".to_string()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, MatchErrorKind::MatchFull);
    assert!(store.created_at(created.match_id).await.is_ok());
}

#[tokio::test]
async fn test_unknown_match_is_not_found() {
    let store = InMemoryAuthority::new();
    let err = store.get_status(42).await.unwrap_err();
    assert_eq!(err.kind, MatchErrorKind::MatchNotFound);
}

#[tokio::test]
async fn test_accepted_and_rejected_moves() {
    let store = started().await;

    let receipt = store.submit_move(1, "alice", mv("e2e4")).await.expect("submit");
    assert!(receipt.accepted);
    assert_eq!(
        receipt.board_notation,
        "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
    );

    let again = store.submit_move(1, "alice", mv("d2d4")).await.expect("submit");
    assert!(!again.accepted);
    assert_eq!(again.error, Some(MatchErrorKind::NotYourTurn));
    assert_eq!(again.board_notation, receipt.board_notation);

    let illegal = store.submit_move(1, "bob", mv("e7e4")).await.expect("submit");
    assert!(!illegal.accepted);
    assert_eq!(illegal.error, Some(MatchErrorKind::IllegalMove));

    let status = store.get_status(1).await.expect("status");
    assert_eq!(status.session.move_count, 1);
    assert_eq!(status.turn, Some(Color::Black));
}

#[tokio::test]
async fn test_paused_match_rejects_moves_in_band() {
    let store = started().await;
    let paused = store
        .control_action(1, "bob", ControlAction::Pause)
        .await
        .expect("control");
    assert!(paused.accepted);
    assert_eq!(paused.status, SessionStatus::Paused);

    let receipt = store.submit_move(1, "alice", mv("e2e4")).await.expect("submit");
    assert!(!receipt.accepted);
    assert_eq!(receipt.error, Some(MatchErrorKind::GameNotActive));
    assert_eq!(
        receipt.reason.as_deref(),
        Some("Game is not active: Game is paused")
    );
}

#[tokio::test]
async fn test_one_move_per_turn_under_contention() {
    let store = started().await;
    let (first, second) = tokio::join!(
        store.submit_move(1, "alice", mv("e2e4")),
        store.submit_move(1, "alice", mv("d2d4")),
    );
    let accepted = [first.expect("submit"), second.expect("submit")]
        .iter()
        .filter(|r| r.accepted)
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(store.get_status(1).await.expect("status").session.move_count, 1);
}

#[tokio::test]
async fn test_rejected_control_action_is_in_band() {
    let store = started().await;
    let receipt = store
        .control_action(1, "alice", ControlAction::DrawAccept)
        .await
        .expect("control");
    assert!(!receipt.accepted);
    assert_eq!(receipt.error, Some(MatchErrorKind::InvalidTransition));
    assert_eq!(receipt.status, SessionStatus::Playing);
}

#[tokio::test]
async fn test_rematch_creates_new_match_with_swapped_colours() {
    let store = started().await;
    store.submit_move(1, "alice", mv("e2e4")).await.expect("submit");
    for (actor, action) in [
        ("bob", ControlAction::Surrender),
        ("alice", ControlAction::RematchOffer),
    ] {
        let receipt = store.control_action(1, actor, action).await.expect("control");
        assert!(receipt.accepted, "{action} rejected");
    }

    let accepted = store
        .control_action(1, "bob", ControlAction::RematchAccept)
        .await
        .expect("control");
    assert!(accepted.accepted);
    let new_id = accepted.new_match_id.expect("new match id");
    assert_ne!(new_id, 1);

    let old = store.get_status(1).await.expect("status");
    assert_eq!(old.status, SessionStatus::Finished);
    assert_eq!(old.rematch_id, Some(new_id));

    let fresh = store.get_status(new_id).await.expect("status");
    assert_eq!(fresh.status, SessionStatus::Playing);
    assert_eq!(fresh.board_notation, STARTING_POSITION);
    assert_eq!(fresh.session.color_of("bob"), Some(Color::White));
    assert_eq!(fresh.session.move_count, 0);
    assert_eq!(store.match_count().await, 2);
}

#[tokio::test]
async fn test_automated_opponent_replies() {
    let store = InMemoryAuthority::new();
    let created = store
        .create_automated_match(alice(), Arc::new(FirstLegalMove))
        .await
        .expect("create");
    let status = store.get_status(created.match_id).await.expect("status");
    assert_eq!(status.status, SessionStatus::Playing);
    assert_eq!(status.session.color_of(AUTOMATED_PLAYER_ID), Some(Color::Black));

    let receipt = store
        .submit_move(created.match_id, "alice", mv("e2e4"))
        .await
        .expect("submit");
    assert!(receipt.accepted);
    let reply = receipt.automated_reply.expect("automated reply");
    assert_eq!(reply.status, SessionStatus::Playing);

    let status = store.get_status(created.match_id).await.expect("status");
    assert_eq!(status.turn, Some(Color::White));
    assert_eq!(status.session.move_count, 2);

    let err = store
        .submit_automated_opponent_move(created.match_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, MatchErrorKind::InvalidTransition);
}
