//! Contract with the authoritative match store.
//!
//! The store owns the canonical board and session of every match. Clients
//! talk to it through [`MatchAuthority`]; the in-memory store and the HTTP
//! client both implement it, and the REST surface exchanges the wire types
//! defined here.

use crate::error::{MatchErrorKind, MatchResult};
use crate::session::{
    ControlAction, MatchId, MatchSession, Outcome, Participant, PlayerId, SessionStatus,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strictly_chess::{Color, Move, PieceKind, Square};

// ─────────────────────────────────────────────────────────────
//  Requests
// ─────────────────────────────────────────────────────────────

/// Body of create and join requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct SeatRequest {
    /// Player taking the seat.
    pub player_id: PlayerId,
    /// Display name.
    pub player_name: String,
}

impl From<SeatRequest> for Participant {
    fn from(req: SeatRequest) -> Self {
        Participant::new(req.player_id, req.player_name)
    }
}

impl From<&Participant> for SeatRequest {
    fn from(p: &Participant) -> Self {
        SeatRequest::new(p.id.clone(), p.name.clone())
    }
}

/// Body of a move submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Acting player.
    pub player_id: PlayerId,
    /// Origin square.
    pub from: Square,
    /// Destination square.
    pub to: Square,
    /// Promotion piece, queen when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PieceKind>,
}

impl MoveRequest {
    /// Builds the request for `mv` by `player_id`.
    pub fn new(player_id: impl Into<PlayerId>, mv: &Move) -> Self {
        Self {
            player_id: player_id.into(),
            from: mv.from,
            to: mv.to,
            promotion: mv.promotion,
        }
    }

    /// The requested move. The capture flag is left for the board to fill.
    pub fn to_move(&self) -> Move {
        let mv = Move::new(self.from, self.to);
        match self.promotion {
            Some(kind) => mv.promoting_to(kind),
            None => mv,
        }
    }
}

/// Body of a control request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct ControlRequest {
    /// Acting player.
    pub player_id: PlayerId,
    /// Requested action.
    pub action: ControlAction,
}

// ─────────────────────────────────────────────────────────────
//  Responses
// ─────────────────────────────────────────────────────────────

/// Response to creating a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedMatch {
    /// Id of the new match.
    pub match_id: MatchId,
    /// Starting board.
    pub board_notation: String,
    /// Colour the creator will play.
    pub color: Color,
}

/// Response to joining a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedMatch {
    /// Joined match.
    pub match_id: MatchId,
    /// Current board.
    pub board_notation: String,
    /// Colour the joiner plays.
    pub color: Color,
}

/// Move played by the automated opponent in reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomatedReply {
    /// The opponent's move.
    pub mv: Move,
    /// Status after the reply.
    pub status: SessionStatus,
}

/// Response to a move submission.
///
/// Rejections are reported in-band with `accepted: false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveReceipt {
    /// Whether the move was applied.
    pub accepted: bool,
    /// Board after the move, or the unchanged board on rejection.
    pub board_notation: String,
    /// Session status after the move.
    pub status: SessionStatus,
    /// Why the move was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Category of the rejection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<MatchErrorKind>,
    /// Reply from an automated opponent, already applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automated_reply: Option<AutomatedReply>,
}

/// Authoritative snapshot returned by status polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Match the snapshot describes.
    pub match_id: MatchId,
    /// Coarse status.
    pub status: SessionStatus,
    /// Side to move while playing or paused.
    pub turn: Option<Color>,
    /// Canonical board.
    pub board_notation: String,
    /// Replacement match after an accepted rematch.
    pub rematch_id: Option<MatchId>,
    /// White's remaining time in milliseconds, when the store keeps a clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white_time_ms: Option<u64>,
    /// Black's remaining time in milliseconds, when the store keeps a clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub black_time_ms: Option<u64>,
    /// Full session.
    pub session: MatchSession,
}

impl StatusSnapshot {
    /// Snapshot of `session` with `board_notation`.
    pub fn new(session: &MatchSession, board_notation: String) -> Self {
        Self {
            match_id: session.id,
            status: session.status(),
            turn: session.turn(),
            board_notation,
            rematch_id: session.rematch_id(),
            white_time_ms: None,
            black_time_ms: None,
            session: session.clone(),
        }
    }

    /// The same snapshot with both sides' remaining time.
    pub fn with_clock(self, white: Duration, black: Duration) -> Self {
        let ms = |d: Duration| u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
        Self {
            white_time_ms: Some(ms(white)),
            black_time_ms: Some(ms(black)),
            ..self
        }
    }

    /// Remaining time of `color`, when reported.
    pub fn remaining(&self, color: Color) -> Option<Duration> {
        match color {
            Color::White => self.white_time_ms,
            Color::Black => self.black_time_ms,
        }
        .map(Duration::from_millis)
    }

    /// Result, once finished.
    pub fn outcome(&self) -> Option<Outcome> {
        self.session.outcome()
    }
}

/// Response to a control action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlReceipt {
    /// Whether the action was applied.
    pub accepted: bool,
    /// Status of the addressed match afterwards.
    pub status: SessionStatus,
    /// New match created by an accepted rematch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_match_id: Option<MatchId>,
    /// Why the action was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Category of the rejection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<MatchErrorKind>,
}

// ─────────────────────────────────────────────────────────────
//  Contract
// ─────────────────────────────────────────────────────────────

/// Operations offered by the authoritative match store.
///
/// The store serializes move acceptance per match: of two near-simultaneous
/// submissions for the same turn at most one is applied. `Err` is reserved
/// for failures outside the game (unknown match, unreachable store); game
/// rejections come back in-band on the receipts.
#[async_trait]
pub trait MatchAuthority: Send + Sync {
    /// Creates a match waiting for an opponent.
    async fn create_match(&self, host: Participant) -> MatchResult<CreatedMatch>;

    /// Seats a second player, starting the match.
    async fn join_match(&self, match_id: MatchId, joiner: Participant)
    -> MatchResult<JoinedMatch>;

    /// Submits a move.
    async fn submit_move(
        &self,
        match_id: MatchId,
        actor: &str,
        mv: Move,
    ) -> MatchResult<MoveReceipt>;

    /// Fetches the authoritative snapshot.
    async fn get_status(&self, match_id: MatchId) -> MatchResult<StatusSnapshot>;

    /// Requests a control action.
    async fn control_action(
        &self,
        match_id: MatchId,
        actor: &str,
        action: ControlAction,
    ) -> MatchResult<ControlReceipt>;
}
