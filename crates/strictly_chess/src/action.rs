//! First-class move type for chess.
//!
//! A `Move` describes the intent to relocate one piece. It can be validated
//! against a board before being applied, serialized for the wire and
//! formatted for the move history.

use super::types::{PieceKind, Square};
use serde::{Deserialize, Serialize};

/// A move from one square to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// Origin square.
    pub from: Square,
    /// Destination square.
    pub to: Square,
    /// Whether the destination holds an enemy piece.
    #[serde(default)]
    pub is_capture: bool,
    /// Piece a pawn promotes into, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PieceKind>,
}

impl Move {
    /// Creates a quiet move.
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            is_capture: false,
            promotion: None,
        }
    }

    /// Marks the move as a capture.
    pub fn capturing(self) -> Self {
        Self {
            is_capture: true,
            ..self
        }
    }

    /// Sets the promotion piece.
    pub fn promoting_to(self, kind: PieceKind) -> Self {
        Self {
            promotion: Some(kind),
            ..self
        }
    }

    /// Whether two moves name the same origin, destination and promotion.
    ///
    /// The capture flag is derived from the board, so callers that build a
    /// move from user input may leave it unset.
    pub fn same_route(&self, other: &Move) -> bool {
        self.from == other.from && self.to == other.to && self.promotion == other.promotion
    }

    /// Parses coordinate notation such as `e2e4` or `e7e8q`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if !(4..=5).contains(&s.len()) || !s.is_ascii() {
            return None;
        }
        let from = Square::parse(&s[0..2])?;
        let to = Square::parse(&s[2..4])?;
        let mut mv = Self::new(from, to);
        if let Some(letter) = s[4..].chars().next() {
            let kind = PieceKind::from_letter(letter).filter(|k| k.is_promotion_target())?;
            mv = mv.promoting_to(kind);
        }
        Some(mv)
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(kind) = self.promotion {
            write!(f, "{}", kind.letter().to_ascii_lowercase())?;
        }
        Ok(())
    }
}

/// Error that can occur when validating or applying a move.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum MoveError {
    /// Origin and destination are the same square.
    #[display("Move from {} to itself", _0)]
    NullMove(#[error(not(source))] Square),

    /// The origin square is empty.
    #[display("No piece on {}", _0)]
    EmptySquare(#[error(not(source))] Square),

    /// The piece on the origin square belongs to the side not on move.
    #[display("Piece on {} does not belong to the side to move", _0)]
    WrongColor(#[error(not(source))] Square),

    /// The move is not among the legal moves of the position.
    #[display("Illegal move {}", _0)]
    Illegal(#[error(not(source))] Move),

    /// The game has already reached a terminal position.
    #[display("Game is already over")]
    GameOver,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_move_error_is_a_leaf_error() {
        let sq = Square::parse("e2").expect("valid square");
        let err: Box<dyn Error> = Box::new(MoveError::EmptySquare(sq));
        assert_eq!(err.to_string(), "No piece on e2");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_parse_coordinate_notation() {
        let mv = Move::parse("e2e4").expect("valid move");
        assert_eq!(mv.from.to_string(), "e2");
        assert_eq!(mv.to.to_string(), "e4");
        assert_eq!(mv.promotion, None);

        let promo = Move::parse("a7a8n").expect("valid promotion");
        assert_eq!(promo.promotion, Some(PieceKind::Knight));
        assert_eq!(promo.to_string(), "a7a8n");
    }

    #[test]
    fn test_parse_rejects_bad_promotion() {
        assert!(Move::parse("a7a8k").is_none());
        assert!(Move::parse("a7a8p").is_none());
        assert!(Move::parse("e2").is_none());
    }

    #[test]
    fn test_same_route_ignores_capture_flag() {
        let quiet = Move::parse("d1d7").expect("valid");
        assert!(quiet.same_route(&quiet.capturing()));
    }
}
