//! Human-readable move history.
//!
//! History entries are for display only. The board notation string is what
//! clients exchange and trust.

use crate::{Move, Piece, PieceKind};
use serde::{Deserialize, Serialize};

/// Formats applied moves for the move-history display.
///
/// ```
/// use strictly_chess::{Color, Move, NotationFormatter, Piece, PieceKind};
///
/// let knight = Piece::new(PieceKind::Knight, Color::White);
/// let mv = Move::parse("g1f3").unwrap();
/// assert_eq!(NotationFormatter::format(knight, &mv), "White knight g1-f3");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NotationFormatter;

impl NotationFormatter {
    /// Describes `mv` as played by `piece`.
    ///
    /// `-` separates the squares of a quiet move and `x` those of a capture.
    /// Promotions end in `=` and the new piece letter; castling is tagged
    /// `O-O` or `O-O-O`.
    pub fn format(piece: Piece, mv: &Move) -> String {
        let separator = if mv.is_capture { 'x' } else { '-' };
        let mut text = format!(
            "{} {} {}{}{}",
            piece.color, piece.kind, mv.from, separator, mv.to
        );

        if piece.kind == PieceKind::Pawn {
            if let Some(kind) = mv.promotion {
                text.push('=');
                text.push(kind.letter());
            }
        }

        if piece.kind == PieceKind::King && mv.from.file().abs_diff(mv.to.file()) == 2 {
            text.push_str(if mv.to.file() > mv.from.file() {
                " O-O"
            } else {
                " O-O-O"
            });
        }

        text
    }
}

/// One entry of the move history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// 1-based ply number.
    pub ply: usize,
    /// The move as applied.
    pub mv: Move,
    /// The piece that moved, before moving.
    pub piece: Piece,
    /// Display text from [`NotationFormatter`].
    pub text: String,
}

impl MoveRecord {
    /// Builds the record for the `ply`-th move.
    pub fn new(ply: usize, piece: Piece, mv: Move) -> Self {
        Self {
            ply,
            mv,
            piece,
            text: NotationFormatter::format(piece, &mv),
        }
    }
}

impl std::fmt::Display for MoveRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}. {}", self.ply, self.text)
    }
}
