//! Game rules for chess.
//!
//! Pure functions over [`Board`] values: move generation, move application
//! and terminal detection. Rules are kept apart from board storage so the
//! session layer can compose them into its own checks.

mod apply;
mod check;
pub mod draw;
pub mod mate;
mod movement;

pub use apply::apply_move;
pub use check::{is_attacked, is_check};
pub use draw::{is_fifty_move_rule, is_insufficient_material};
pub use mate::{Termination, is_checkmate, is_draw, is_stalemate, termination};

use crate::{Board, Move, Square};
use tracing::instrument;

/// Legal moves for the piece on `square`.
///
/// Empty when the square is empty or holds a piece of the side not on
/// move. Every returned move leaves the mover's own king unattacked.
#[instrument(level = "trace", skip(board, square), fields(square = %square))]
pub fn legal_moves(board: &Board, square: Square) -> Vec<Move> {
    let Some(piece) = board.get(square) else {
        return Vec::new();
    };
    if piece.color != board.side_to_move() {
        return Vec::new();
    }

    movement::pseudo_legal_moves(board, square)
        .into_iter()
        .filter(|mv| {
            apply_move(board, mv).is_ok_and(|next| !is_check(&next, piece.color))
        })
        .collect()
}

/// Legal moves for every piece of the side to move.
pub fn all_legal_moves(board: &Board) -> Vec<Move> {
    board
        .pieces_of(board.side_to_move())
        .flat_map(|(square, _)| legal_moves(board, square))
        .collect()
}

/// Whether the side to move has at least one legal move.
pub fn has_legal_moves(board: &Board) -> bool {
    board
        .pieces_of(board.side_to_move())
        .any(|(square, _)| !legal_moves(board, square).is_empty())
}

/// Finds the legal move matching `candidate`'s route.
///
/// A candidate without a promotion piece matches the default queen
/// promotion. An explicit knight, bishop or rook promotion is accepted
/// whenever the queen promotion on the same route is legal.
pub fn find_legal(board: &Board, candidate: &Move) -> Option<Move> {
    legal_moves(board, candidate.from)
        .into_iter()
        .find(|legal| {
            legal.from == candidate.from
                && legal.to == candidate.to
                && match (legal.promotion, candidate.promotion) {
                    (_, None) => true,
                    (Some(_), Some(kind)) => kind.is_promotion_target(),
                    (None, Some(_)) => false,
                }
        })
        .map(|legal| Move {
            promotion: candidate.promotion.or(legal.promotion),
            ..legal
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, Piece, PieceKind};

    fn sq(s: &str) -> Square {
        Square::parse(s).expect("valid square")
    }

    #[test]
    fn test_twenty_moves_from_start() {
        assert_eq!(all_legal_moves(&Board::standard()).len(), 20);
    }

    #[test]
    fn test_wrong_side_has_no_moves() {
        let board = Board::standard();
        assert!(legal_moves(&board, sq("e7")).is_empty());
        assert!(legal_moves(&board, sq("e4")).is_empty());
    }

    #[test]
    fn test_pinned_piece_cannot_leave_line() {
        let board = Board::empty()
            .with_piece(sq("e1"), Some(Piece::new(PieceKind::King, Color::White)))
            .with_piece(sq("e2"), Some(Piece::new(PieceKind::Bishop, Color::White)))
            .with_piece(sq("e8"), Some(Piece::new(PieceKind::Rook, Color::Black)))
            .with_piece(sq("a8"), Some(Piece::new(PieceKind::King, Color::Black)));
        assert!(legal_moves(&board, sq("e2")).is_empty());
    }

    #[test]
    fn test_king_cannot_step_into_attack() {
        let board = Board::empty()
            .with_piece(sq("e1"), Some(Piece::new(PieceKind::King, Color::White)))
            .with_piece(sq("d8"), Some(Piece::new(PieceKind::Rook, Color::Black)))
            .with_piece(sq("h8"), Some(Piece::new(PieceKind::King, Color::Black)));
        let dests: Vec<Square> = legal_moves(&board, sq("e1")).iter().map(|m| m.to).collect();
        assert!(!dests.contains(&sq("d1")));
        assert!(!dests.contains(&sq("d2")));
        assert!(dests.contains(&sq("f1")));
    }

    #[test]
    fn test_find_legal_accepts_underpromotion() {
        let board = Board::empty()
            .with_piece(sq("a7"), Some(Piece::new(PieceKind::Pawn, Color::White)))
            .with_piece(sq("e1"), Some(Piece::new(PieceKind::King, Color::White)))
            .with_piece(sq("h8"), Some(Piece::new(PieceKind::King, Color::Black)));
        let knight = Move::parse("a7a8n").expect("valid");
        let found = find_legal(&board, &knight).expect("legal route");
        assert_eq!(found.promotion, Some(PieceKind::Knight));

        let bare = Move::parse("a7a8").expect("valid");
        let found = find_legal(&board, &bare).expect("legal route");
        assert_eq!(found.promotion, Some(PieceKind::Queen));
    }
}
