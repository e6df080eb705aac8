//! Match error types.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// Category of a match error.
///
/// Every rejection a participant can see falls into one of these. The
/// kind travels over the wire as its SCREAMING_SNAKE name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchErrorKind {
    /// The move is not legal on the current board.
    #[display("Illegal move")]
    IllegalMove,
    /// The actor is seated but it is the other side's turn.
    #[display("Not your turn")]
    NotYourTurn,
    /// Moves are only accepted while the match is playing.
    #[display("Game is not active")]
    GameNotActive,
    /// The control action is not allowed in the current state.
    #[display("Invalid transition")]
    InvalidTransition,
    /// The actor is not seated in this match.
    #[display("Not a participant")]
    NotAParticipant,
    /// No match with the given id.
    #[display("Match not found")]
    MatchNotFound,
    /// Both seats are taken.
    #[display("Match is full")]
    MatchFull,
    /// A previous move submission has not resolved yet.
    #[display("Move already in flight")]
    MoveInFlight,
    /// Network or backend failure talking to the authoritative store.
    #[display("Collaborator unavailable")]
    CollaboratorUnavailable,
    /// A snapshot refers to a match this client no longer tracks.
    #[display("Stale snapshot")]
    StaleSnapshot,
    /// A snapshot could not be decoded.
    #[display("Corrupt snapshot")]
    CorruptSnapshot,
}

/// Match error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("{}: {} at {}:{}", kind, message, file, line)]
pub struct MatchError {
    /// Error category.
    pub kind: MatchErrorKind,
    /// Human-readable detail.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl MatchError {
    /// Creates a new match error with caller location tracking.
    #[track_caller]
    pub fn new(kind: MatchErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Message shown to the acting participant.
    pub fn user_message(&self) -> String {
        if self.message.is_empty() {
            self.kind.to_string()
        } else {
            format!("{}: {}", self.kind, self.message)
        }
    }
}

impl From<strictly_chess::MoveError> for MatchError {
    #[track_caller]
    fn from(err: strictly_chess::MoveError) -> Self {
        match err {
            strictly_chess::MoveError::GameOver => {
                Self::new(MatchErrorKind::GameNotActive, err.to_string())
            }
            _ => Self::new(MatchErrorKind::IllegalMove, err.to_string()),
        }
    }
}

impl From<strictly_chess::NotationError> for MatchError {
    #[track_caller]
    fn from(err: strictly_chess::NotationError) -> Self {
        Self::new(MatchErrorKind::CorruptSnapshot, err.to_string())
    }
}

impl From<reqwest::Error> for MatchError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        Self::new(MatchErrorKind::CollaboratorUnavailable, err.to_string())
    }
}

/// Result alias for match operations.
pub type MatchResult<T> = Result<T, MatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_records_caller_location() {
        let err = MatchError::new(MatchErrorKind::NotYourTurn, "White to move");
        assert_eq!(err.file, file!());
        assert!(err.line > 0);
        assert_eq!(err.user_message(), "Not your turn: White to move");
    }

    #[test]
    fn test_kind_wire_names() {
        let json = serde_json::to_string(&MatchErrorKind::GameNotActive).expect("serialize");
        assert_eq!(json, "\"GAME_NOT_ACTIVE\"");
    }
}
