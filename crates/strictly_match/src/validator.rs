//! Move validation before a move leaves the client.
//!
//! Each precondition is its own check so the authoritative store and the
//! local client can share them. [`MoveValidator`] runs them in priority
//! order: session status, then turn, then board legality.

use crate::error::{MatchError, MatchErrorKind, MatchResult};
use crate::session::{MatchSession, SessionStatus};
use strictly_chess::{Board, Move, find_legal};
use tracing::{instrument, warn};

// ─────────────────────────────────────────────────────────────
//  Move Preconditions
// ─────────────────────────────────────────────────────────────

/// Precondition: the session must be playing.
pub struct SessionIsActive;

impl SessionIsActive {
    /// Checks the session status.
    #[instrument(skip(session), fields(match_id = session.id))]
    pub fn check(session: &MatchSession) -> MatchResult<()> {
        match session.status() {
            SessionStatus::Playing => Ok(()),
            SessionStatus::Paused => Err(MatchError::new(
                MatchErrorKind::GameNotActive,
                "Game is paused",
            )),
            SessionStatus::Waiting => Err(MatchError::new(
                MatchErrorKind::GameNotActive,
                "Waiting for opponent",
            )),
            SessionStatus::Finished => Err(MatchError::new(
                MatchErrorKind::GameNotActive,
                "Game is over",
            )),
        }
    }
}

/// Precondition: the actor must hold the side to move.
pub struct ActorHasTurn;

impl ActorHasTurn {
    /// Checks that `actor` is seated and on move.
    #[instrument(skip(session), fields(match_id = session.id))]
    pub fn check(session: &MatchSession, actor: &str) -> MatchResult<()> {
        let Some(color) = session.color_of(actor) else {
            return Err(MatchError::new(
                MatchErrorKind::NotAParticipant,
                format!("{actor} is not in match {}", session.id),
            ));
        };
        match session.turn() {
            Some(turn) if turn == color => Ok(()),
            Some(turn) => Err(MatchError::new(
                MatchErrorKind::NotYourTurn,
                format!("{turn} to move"),
            )),
            None => Err(MatchError::new(
                MatchErrorKind::GameNotActive,
                "No side is on move",
            )),
        }
    }
}

/// Precondition: the move must be among the board's legal moves.
pub struct MoveIsLegal;

impl MoveIsLegal {
    /// Checks legality and returns the move as the board sees it, with
    /// the capture flag and promotion piece filled in.
    #[instrument(skip(board, mv), fields(mv = %mv))]
    pub fn check(board: &Board, mv: &Move) -> MatchResult<Move> {
        find_legal(board, mv).ok_or_else(|| {
            MatchError::new(MatchErrorKind::IllegalMove, format!("{mv} is not legal"))
        })
    }
}

/// Single gatekeeper for candidate moves.
pub struct MoveValidator;

impl MoveValidator {
    /// Validates `mv` by `actor` against `session` and `board`.
    ///
    /// Pure: nothing is modified. On success returns the normalized move
    /// the caller should apply.
    ///
    /// # Errors
    ///
    /// `GameNotActive`, `NotAParticipant`, `NotYourTurn` or `IllegalMove`,
    /// checked in that order.
    #[instrument(skip(session, board, mv), fields(match_id = session.id, mv = %mv))]
    pub fn validate(
        session: &MatchSession,
        board: &Board,
        actor: &str,
        mv: &Move,
    ) -> MatchResult<Move> {
        let result = SessionIsActive::check(session)
            .and_then(|()| ActorHasTurn::check(session, actor))
            .and_then(|()| MoveIsLegal::check(board, mv));
        if let Err(e) = &result {
            warn!(actor, kind = %e.kind, "Move rejected");
        }
        result
    }
}
