//! Terminal-position detection.

use super::draw::{is_fifty_move_rule, is_insufficient_material};
use super::{has_legal_moves, is_check};
use crate::{Board, Color};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Why a game ended on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// The side to move is in check with no legal move.
    #[display("{winner} wins by checkmate")]
    Checkmate {
        /// Side that delivered mate.
        winner: Color,
    },
    /// The side to move is not in check and has no legal move.
    #[display("Draw by stalemate")]
    Stalemate,
    /// Neither side can mate.
    #[display("Draw by insufficient material")]
    InsufficientMaterial,
    /// Fifty full moves without a capture or pawn move.
    #[display("Draw by the fifty-move rule")]
    FiftyMoveRule,
    /// The same position arose three times.
    #[display("Draw by threefold repetition")]
    ThreefoldRepetition,
}

impl Termination {
    /// Winning side, or `None` for a draw.
    pub fn winner(self) -> Option<Color> {
        match self {
            Termination::Checkmate { winner } => Some(winner),
            _ => None,
        }
    }
}

/// Whether the side to move is checkmated.
#[instrument(level = "debug", skip(board), fields(side = %board.side_to_move()))]
pub fn is_checkmate(board: &Board) -> bool {
    is_check(board, board.side_to_move()) && !has_legal_moves(board)
}

/// Whether the side to move is stalemated.
#[instrument(level = "debug", skip(board), fields(side = %board.side_to_move()))]
pub fn is_stalemate(board: &Board) -> bool {
    !is_check(board, board.side_to_move()) && !has_legal_moves(board)
}

/// Whether the position is drawn on the board alone.
///
/// Stalemate, insufficient material or the fifty-move rule. Repetition
/// is tracked by [`Game`](crate::Game).
pub fn is_draw(board: &Board) -> bool {
    is_stalemate(board) || is_insufficient_material(board) || is_fifty_move_rule(board)
}

/// Terminal state of `board`, if any.
///
/// Mate and stalemate take precedence over the material and clock draws.
#[instrument(level = "debug", skip(board), fields(side = %board.side_to_move()))]
pub fn termination(board: &Board) -> Option<Termination> {
    let side = board.side_to_move();
    if !has_legal_moves(board) {
        return Some(if is_check(board, side) {
            Termination::Checkmate {
                winner: side.opponent(),
            }
        } else {
            Termination::Stalemate
        });
    }
    if is_insufficient_material(board) {
        return Some(Termination::InsufficientMaterial);
    }
    if is_fifty_move_rule(board) {
        return Some(Termination::FiftyMoveRule);
    }
    None
}
