//! Match session state machine.
//!
//! A session is one of four phases, each carrying only the data that phase
//! can have: a waiting match has a host and nothing else, a finished match
//! always has an outcome. Transitions take `&self` and return a new
//! session, so a rejected transition leaves the original untouched.

use crate::error::{MatchError, MatchErrorKind, MatchResult};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use strictly_chess::{Color, Termination};
use tracing::{info, instrument, warn};

/// Unique identifier for a match.
pub type MatchId = u64;

/// Unique identifier for a player.
pub type PlayerId = String;

/// A player seated in a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct Participant {
    /// Player's unique ID.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
}

/// Both seats of a started match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Seats {
    /// Player with the white pieces.
    white: Participant,
    /// Player with the black pieces.
    black: Participant,
}

impl Seats {
    /// Seats two players.
    pub fn new(white: Participant, black: Participant) -> Self {
        Self { white, black }
    }

    /// Player holding `color`.
    pub fn player(&self, color: Color) -> &Participant {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    /// Colour played by `player`, if seated.
    pub fn color_of(&self, player: &str) -> Option<Color> {
        if self.white.id == player {
            Some(Color::White)
        } else if self.black.id == player {
            Some(Color::Black)
        } else {
            None
        }
    }

    /// The same players with colours exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            white: self.black.clone(),
            black: self.white.clone(),
        }
    }
}

/// Coarse status as exchanged with the authoritative store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Waiting for a second player.
    #[display("WAITING")]
    Waiting,
    /// Moves are being played.
    #[display("PLAYING")]
    Playing,
    /// Temporarily halted.
    #[display("PAUSED")]
    Paused,
    /// Over.
    #[display("FINISHED")]
    Finished,
}

/// Why a match ended.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeReason {
    /// The loser was checkmated.
    #[display("checkmate")]
    Checkmate,
    /// The side to move had no legal move and was not in check.
    #[display("stalemate")]
    Stalemate,
    /// Neither side could mate.
    #[display("insufficient material")]
    InsufficientMaterial,
    /// Fifty moves without capture or pawn move.
    #[display("fifty-move rule")]
    FiftyMoveRule,
    /// The same position occurred three times.
    #[display("threefold repetition")]
    ThreefoldRepetition,
    /// Both players agreed to a draw.
    #[display("draw agreed")]
    DrawAgreed,
    /// A player resigned.
    #[display("surrender")]
    Surrender,
    /// The loser ran out of time.
    #[display("timeout")]
    Timeout,
}

/// Final result of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct Outcome {
    /// Winning side, or `None` for a draw.
    pub winner: Option<Color>,
    /// How the match ended.
    pub reason: OutcomeReason,
}

impl Outcome {
    /// Whether the match was drawn.
    pub fn is_draw(&self) -> bool {
        self.winner.is_none()
    }
}

impl From<Termination> for Outcome {
    fn from(end: Termination) -> Self {
        let reason = match end {
            Termination::Checkmate { .. } => OutcomeReason::Checkmate,
            Termination::Stalemate => OutcomeReason::Stalemate,
            Termination::InsufficientMaterial => OutcomeReason::InsufficientMaterial,
            Termination::FiftyMoveRule => OutcomeReason::FiftyMoveRule,
            Termination::ThreefoldRepetition => OutcomeReason::ThreefoldRepetition,
        };
        Self::new(end.winner(), reason)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.winner {
            Some(winner) => write!(f, "{winner} wins by {}", self.reason),
            None => write!(f, "Draw ({})", self.reason),
        }
    }
}

/// State of a started, unfinished match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct ActiveMatch {
    /// Seated players.
    seats: Seats,
    /// Side to move.
    turn: Color,
    /// Side with an open draw offer.
    draw_offer: Option<Color>,
}

/// State of a finished match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct FinishedMatch {
    /// Players as seated when the match ended.
    seats: Seats,
    /// Result.
    outcome: Outcome,
    /// Side with an open rematch offer.
    rematch_offer: Option<Color>,
    /// Match that superseded this one after a rematch.
    rematch_id: Option<MatchId>,
}

impl FinishedMatch {
    fn new(seats: Seats, outcome: Outcome) -> Self {
        Self {
            seats,
            outcome,
            rematch_offer: None,
            rematch_id: None,
        }
    }
}

/// Lifecycle phase of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    /// Created by the host, waiting for an opponent.
    Waiting {
        /// The player who created the match.
        host: Participant,
    },
    /// Moves are accepted.
    Playing(ActiveMatch),
    /// No moves accepted until resumed.
    Paused(ActiveMatch),
    /// Terminal.
    Finished(FinishedMatch),
}

/// Control actions a participant can request.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ControlAction {
    /// Halt the match.
    #[display("PAUSE")]
    Pause,
    /// Continue a paused match.
    #[display("RESUME")]
    Resume,
    /// Offer a draw.
    #[display("DRAW_OFFER")]
    DrawOffer,
    /// Accept the opponent's draw offer.
    #[display("DRAW_ACCEPT")]
    DrawAccept,
    /// Decline the opponent's draw offer.
    #[display("DRAW_DECLINE")]
    DrawDecline,
    /// Resign.
    #[display("SURRENDER")]
    Surrender,
    /// Offer a rematch after the match ended.
    #[display("REMATCH_OFFER")]
    RematchOffer,
    /// Accept the opponent's rematch offer.
    #[display("REMATCH_ACCEPT")]
    RematchAccept,
    /// Decline the opponent's rematch offer.
    #[display("REMATCH_DECLINE")]
    RematchDecline,
}

/// Result of a successful control action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The session moved to a new state.
    Updated(MatchSession),
    /// Both players agreed to a rematch. The caller issues the new id.
    RematchAgreed(RematchAgreement),
}

/// An accepted rematch waiting for its new match id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RematchAgreement {
    previous: MatchSession,
    seats: Seats,
    outcome: Outcome,
}

impl RematchAgreement {
    /// Id of the match being replaced.
    pub fn previous_id(&self) -> MatchId {
        self.previous.id
    }

    /// Opens the rematch under `new_id`.
    ///
    /// Returns the old session, closed for good with `rematch_id` set, and
    /// the new session: playing, colours swapped, no moves.
    #[instrument(skip(self), fields(previous_id = self.previous.id))]
    pub fn open(self, new_id: MatchId) -> (MatchSession, MatchSession) {
        let mut closed = FinishedMatch::new(self.seats.clone(), self.outcome);
        closed.rematch_id = Some(new_id);
        let closed = MatchSession {
            phase: SessionPhase::Finished(closed),
            ..self.previous
        };

        let fresh = MatchSession {
            id: new_id,
            phase: SessionPhase::Playing(ActiveMatch {
                seats: self.seats.swapped(),
                turn: Color::White,
                draw_offer: None,
            }),
            move_count: 0,
        };
        info!(new_id, "Rematch opened with colours swapped");
        (closed, fresh)
    }
}

/// One match between two players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSession {
    /// Match id.
    pub id: MatchId,
    /// Current phase.
    pub phase: SessionPhase,
    /// Moves accepted so far.
    pub move_count: u32,
}

// ─────────────────────────────────────────────────────────────
//  Constructors
// ─────────────────────────────────────────────────────────────

impl MatchSession {
    /// Creates a match waiting for an opponent.
    #[instrument(skip(host), fields(host = %host.id))]
    pub fn create(id: MatchId, host: Participant) -> Self {
        info!("Creating match session");
        Self {
            id,
            phase: SessionPhase::Waiting { host },
            move_count: 0,
        }
    }

    /// Builds a session from parts, as a client reconstructs one.
    pub fn from_parts(id: MatchId, phase: SessionPhase, move_count: u32) -> Self {
        Self {
            id,
            phase,
            move_count,
        }
    }
}

// ─────────────────────────────────────────────────────────────
//  Queries
// ─────────────────────────────────────────────────────────────

impl MatchSession {
    /// Coarse status.
    pub fn status(&self) -> SessionStatus {
        match self.phase {
            SessionPhase::Waiting { .. } => SessionStatus::Waiting,
            SessionPhase::Playing(_) => SessionStatus::Playing,
            SessionPhase::Paused(_) => SessionStatus::Paused,
            SessionPhase::Finished(_) => SessionStatus::Finished,
        }
    }

    /// Seated players, once both have joined.
    pub fn seats(&self) -> Option<&Seats> {
        match &self.phase {
            SessionPhase::Waiting { .. } => None,
            SessionPhase::Playing(active) | SessionPhase::Paused(active) => Some(&active.seats),
            SessionPhase::Finished(finished) => Some(&finished.seats),
        }
    }

    /// Whether `player` takes part in this match.
    pub fn is_participant(&self, player: &str) -> bool {
        match &self.phase {
            SessionPhase::Waiting { host } => host.id == player,
            _ => self.color_of(player).is_some(),
        }
    }

    /// Colour played by `player`, once seated.
    pub fn color_of(&self, player: &str) -> Option<Color> {
        self.seats().and_then(|seats| seats.color_of(player))
    }

    /// Side to move while the match is playing or paused.
    pub fn turn(&self) -> Option<Color> {
        match &self.phase {
            SessionPhase::Playing(active) | SessionPhase::Paused(active) => Some(active.turn),
            _ => None,
        }
    }

    /// Player whose turn it is.
    pub fn player_to_move(&self) -> Option<&Participant> {
        let turn = self.turn()?;
        self.seats().map(|seats| seats.player(turn))
    }

    /// Side with an open draw offer.
    pub fn draw_offer(&self) -> Option<Color> {
        match &self.phase {
            SessionPhase::Playing(active) | SessionPhase::Paused(active) => active.draw_offer,
            _ => None,
        }
    }

    /// Side with an open rematch offer.
    pub fn rematch_offer(&self) -> Option<Color> {
        match &self.phase {
            SessionPhase::Finished(finished) => finished.rematch_offer,
            _ => None,
        }
    }

    /// Result, once finished.
    pub fn outcome(&self) -> Option<Outcome> {
        match &self.phase {
            SessionPhase::Finished(finished) => Some(finished.outcome),
            _ => None,
        }
    }

    /// Match that superseded this one, if a rematch was accepted.
    pub fn rematch_id(&self) -> Option<MatchId> {
        match &self.phase {
            SessionPhase::Finished(finished) => finished.rematch_id,
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────
//  Transitions
// ─────────────────────────────────────────────────────────────

impl MatchSession {
    /// Seats the second player. The host plays White.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` if the host tries to join their own match,
    /// `MatchFull` once both seats are taken, `GameNotActive` when finished.
    #[instrument(skip(self, joiner), fields(match_id = self.id, joiner = %joiner.id))]
    pub fn join(&self, joiner: Participant) -> MatchResult<Self> {
        match &self.phase {
            SessionPhase::Waiting { host } if host.id == joiner.id => Err(MatchError::new(
                MatchErrorKind::InvalidTransition,
                "Cannot join your own match",
            )),
            SessionPhase::Waiting { host } => {
                info!(white = %host.id, black = %joiner.id, "Second player joined, match starts");
                Ok(self.with_phase(SessionPhase::Playing(ActiveMatch {
                    seats: Seats::new(host.clone(), joiner),
                    turn: Color::White,
                    draw_offer: None,
                })))
            }
            SessionPhase::Playing(_) | SessionPhase::Paused(_) => {
                warn!("Join rejected, match full");
                Err(MatchError::new(MatchErrorKind::MatchFull, "Both seats are taken"))
            }
            SessionPhase::Finished(_) => Err(MatchError::new(
                MatchErrorKind::GameNotActive,
                "Match already finished",
            )),
        }
    }

    /// Records an accepted move by `mover`.
    ///
    /// The turn flips and the move count grows. When `end` is set the match
    /// finishes with the matching outcome instead. An open draw offer
    /// survives the move.
    ///
    /// # Errors
    ///
    /// `NotAParticipant`, `GameNotActive` unless playing, or `NotYourTurn`.
    #[instrument(skip(self), fields(match_id = self.id, status = %self.status()))]
    pub fn after_move(&self, mover: &str, end: Option<Termination>) -> MatchResult<Self> {
        self.require_participant(mover)?;
        let SessionPhase::Playing(active) = &self.phase else {
            return Err(MatchError::new(
                MatchErrorKind::GameNotActive,
                format!("Match is {}", self.status()),
            ));
        };
        if active.seats.color_of(mover) != Some(active.turn) {
            return Err(MatchError::new(
                MatchErrorKind::NotYourTurn,
                format!("{} to move", active.turn),
            ));
        }

        let phase = match end {
            Some(end) => {
                let outcome = Outcome::from(end);
                info!(%outcome, "Match finished on the board");
                SessionPhase::Finished(FinishedMatch::new(active.seats.clone(), outcome))
            }
            None => SessionPhase::Playing(ActiveMatch {
                turn: active.turn.opponent(),
                ..active.clone()
            }),
        };
        Ok(Self {
            id: self.id,
            phase,
            move_count: self.move_count + 1,
        })
    }

    /// Ends a playing match because `loser` ran out of time.
    ///
    /// # Errors
    ///
    /// `GameNotActive` unless playing, `InvalidTransition` if `loser` is
    /// not on move.
    #[instrument(skip(self), fields(match_id = self.id, status = %self.status()))]
    pub fn time_out(&self, loser: Color) -> MatchResult<Self> {
        let SessionPhase::Playing(active) = &self.phase else {
            return Err(MatchError::new(
                MatchErrorKind::GameNotActive,
                format!("Match is {}", self.status()),
            ));
        };
        if active.turn != loser {
            return Err(MatchError::new(
                MatchErrorKind::InvalidTransition,
                format!("{loser} is not on move"),
            ));
        }
        let outcome = Outcome::new(Some(loser.opponent()), OutcomeReason::Timeout);
        info!(%outcome, "Match finished on time");
        Ok(self.with_phase(SessionPhase::Finished(FinishedMatch::new(
            active.seats.clone(),
            outcome,
        ))))
    }

    /// Applies a control action requested by `actor`.
    ///
    /// # Errors
    ///
    /// `NotAParticipant` for strangers and `InvalidTransition` for anything
    /// the current phase does not allow, including answering one's own offer.
    #[instrument(skip(self), fields(match_id = self.id, status = %self.status()))]
    pub fn control(&self, actor: &str, action: ControlAction) -> MatchResult<Transition> {
        self.require_participant(actor)?;
        let color = self.color_of(actor);

        let result = match (&self.phase, action, color) {
            (SessionPhase::Playing(active), ControlAction::Pause, _) => {
                Ok(self.updated(SessionPhase::Paused(active.clone())))
            }
            (SessionPhase::Paused(active), ControlAction::Resume, _) => {
                Ok(self.updated(SessionPhase::Playing(active.clone())))
            }
            (SessionPhase::Playing(active), ControlAction::DrawOffer, Some(color))
                if active.draw_offer.is_none() =>
            {
                Ok(self.updated(SessionPhase::Playing(ActiveMatch {
                    draw_offer: Some(color),
                    ..active.clone()
                })))
            }
            (SessionPhase::Playing(active), ControlAction::DrawAccept, Some(color))
                if active.draw_offer == Some(color.opponent()) =>
            {
                let outcome = Outcome::new(None, OutcomeReason::DrawAgreed);
                Ok(self.updated(SessionPhase::Finished(FinishedMatch::new(
                    active.seats.clone(),
                    outcome,
                ))))
            }
            (SessionPhase::Playing(active), ControlAction::DrawDecline, Some(color))
                if active.draw_offer == Some(color.opponent()) =>
            {
                Ok(self.updated(SessionPhase::Playing(ActiveMatch {
                    draw_offer: None,
                    ..active.clone()
                })))
            }
            (
                SessionPhase::Playing(active) | SessionPhase::Paused(active),
                ControlAction::Surrender,
                Some(color),
            ) => {
                let outcome = Outcome::new(Some(color.opponent()), OutcomeReason::Surrender);
                Ok(self.updated(SessionPhase::Finished(FinishedMatch::new(
                    active.seats.clone(),
                    outcome,
                ))))
            }
            (SessionPhase::Finished(finished), ControlAction::RematchOffer, Some(color))
                if finished.rematch_offer.is_none() && finished.rematch_id.is_none() =>
            {
                Ok(self.updated(SessionPhase::Finished(FinishedMatch {
                    rematch_offer: Some(color),
                    ..finished.clone()
                })))
            }
            (SessionPhase::Finished(finished), ControlAction::RematchAccept, Some(color))
                if finished.rematch_offer == Some(color.opponent()) =>
            {
                Ok(Transition::RematchAgreed(RematchAgreement {
                    previous: self.clone(),
                    seats: finished.seats.clone(),
                    outcome: finished.outcome,
                }))
            }
            (SessionPhase::Finished(finished), ControlAction::RematchDecline, Some(color))
                if finished.rematch_offer == Some(color.opponent()) =>
            {
                Ok(self.updated(SessionPhase::Finished(FinishedMatch {
                    rematch_offer: None,
                    ..finished.clone()
                })))
            }
            _ => Err(MatchError::new(
                MatchErrorKind::InvalidTransition,
                format!("{action} not allowed while {}", self.status()),
            )),
        };

        match &result {
            Ok(Transition::Updated(next)) => {
                info!(%action, actor, to = %next.status(), "Control action applied");
            }
            Ok(Transition::RematchAgreed(_)) => info!(actor, "Rematch accepted"),
            Err(e) => warn!(%action, actor, error = %e, "Control action rejected"),
        }
        result
    }

    fn require_participant(&self, player: &str) -> MatchResult<()> {
        if self.is_participant(player) {
            Ok(())
        } else {
            warn!(player, "Actor is not seated in this match");
            Err(MatchError::new(
                MatchErrorKind::NotAParticipant,
                format!("{player} is not in match {}", self.id),
            ))
        }
    }

    fn with_phase(&self, phase: SessionPhase) -> Self {
        Self {
            id: self.id,
            phase,
            move_count: self.move_count,
        }
    }

    fn updated(&self, phase: SessionPhase) -> Transition {
        Transition::Updated(self.with_phase(phase))
    }
}
