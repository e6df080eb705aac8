//! Draw detection that depends on the board alone.
//!
//! Repetition needs the position history and is tracked by [`Game`](crate::Game).

use crate::{Board, PieceKind};
use tracing::instrument;

/// Plies without a capture or pawn move that end the game (50 full moves).
pub const FIFTY_MOVE_PLIES: u32 = 100;

/// Occurrences of one position that end the game.
pub const REPETITION_LIMIT: usize = 3;

/// Whether neither side has the material to deliver mate.
///
/// Covers king vs king, king and one minor piece vs king, and king and
/// bishop vs king and bishop with both bishops on the same square colour.
#[instrument(skip(board))]
pub fn is_insufficient_material(board: &Board) -> bool {
    let mut minors = Vec::new();
    for (square, piece) in board.pieces() {
        match piece.kind {
            PieceKind::King => {}
            PieceKind::Knight | PieceKind::Bishop => minors.push((square, piece)),
            PieceKind::Pawn | PieceKind::Rook | PieceKind::Queen => return false,
        }
    }

    match minors.as_slice() {
        [] | [_] => true,
        [(sq_a, a), (sq_b, b)] => {
            a.kind == PieceKind::Bishop
                && b.kind == PieceKind::Bishop
                && a.color != b.color
                && sq_a.is_light() == sq_b.is_light()
        }
        _ => false,
    }
}

/// Whether the fifty-move rule has been reached.
#[instrument(skip(board), fields(halfmove_clock = board.halfmove_clock()))]
pub fn is_fifty_move_rule(board: &Board) -> bool {
    board.halfmove_clock() >= FIFTY_MOVE_PLIES
}
