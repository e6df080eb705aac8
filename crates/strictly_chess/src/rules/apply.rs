//! Move application.

use crate::{Board, Color, Move, MoveError, PieceKind, Square};
use tracing::instrument;

/// Produces the board that results from playing `mv`.
///
/// Never mutates `board`. The moved piece is marked as moved, a captured
/// piece is removed, a pawn reaching the last rank is promoted (queen by
/// default), a castling king brings its rook along, the clocks advance and
/// the side to move flips.
///
/// This checks only that the move is well formed; legality is the job of
/// [`legal_moves`](super::legal_moves).
///
/// # Errors
///
/// Returns [`MoveError::NullMove`] when `from == to` and
/// [`MoveError::EmptySquare`] when there is nothing to move.
#[instrument(level = "trace", skip_all, fields(mv = %mv))]
pub fn apply_move(board: &Board, mv: &Move) -> Result<Board, MoveError> {
    if mv.from == mv.to {
        return Err(MoveError::NullMove(mv.from));
    }
    let piece = board.get(mv.from).ok_or(MoveError::EmptySquare(mv.from))?;
    let captured = board.get(mv.to);

    let mut next = board.clone();
    next.put(mv.from, None);

    let placed = match piece.kind {
        PieceKind::Pawn if mv.to.rank() == piece.color.promotion_rank() => {
            let kind = mv
                .promotion
                .filter(|k| k.is_promotion_target())
                .unwrap_or(PieceKind::Queen);
            crate::Piece::new(kind, piece.color).moved()
        }
        _ => piece.moved(),
    };
    next.put(mv.to, Some(placed));

    if piece.kind == PieceKind::King && mv.from.file().abs_diff(mv.to.file()) == 2 {
        let rank = mv.from.rank();
        let (rook_from, rook_to) = if mv.to.file() > mv.from.file() {
            (Square::at(rank, 7), Square::at(rank, 5))
        } else {
            (Square::at(rank, 0), Square::at(rank, 3))
        };
        let rook = next.get(rook_from);
        next.put(rook_from, None);
        next.put(rook_to, rook.map(crate::Piece::moved));
    }

    let halfmove = if piece.kind == PieceKind::Pawn || captured.is_some() {
        0
    } else {
        board.halfmove_clock() + 1
    };
    let fullmove = match piece.color {
        Color::Black => board.fullmove_number() + 1,
        Color::White => board.fullmove_number(),
    };
    next.set_clocks(halfmove, fullmove);
    next.set_side_to_move(piece.color.opponent());

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Piece;

    fn sq(s: &str) -> Square {
        Square::parse(s).expect("valid square")
    }

    #[test]
    fn test_apply_relocates_and_marks_moved() {
        let board = Board::standard();
        let next = apply_move(&board, &Move::new(sq("g1"), sq("f3"))).expect("well formed");
        assert!(next.get(sq("g1")).is_none());
        let knight = next.get(sq("f3")).expect("knight moved");
        assert!(knight.has_moved);
        assert_eq!(next.side_to_move(), Color::Black);
        assert_eq!(next.halfmove_clock(), 1);
        assert_eq!(next.fullmove_number(), 1);
    }

    #[test]
    fn test_castling_moves_rook() {
        let board = Board::empty()
            .with_piece(sq("e8"), Some(Piece::new(PieceKind::King, Color::Black)))
            .with_piece(sq("a8"), Some(Piece::new(PieceKind::Rook, Color::Black)))
            .with_side_to_move(Color::Black);
        let next = apply_move(&board, &Move::new(sq("e8"), sq("c8"))).expect("well formed");
        assert_eq!(next.get(sq("d8")).map(|p| p.kind), Some(PieceKind::Rook));
        assert!(next.get(sq("a8")).is_none());
        assert_eq!(next.fullmove_number(), 2);
    }

    #[test]
    fn test_empty_origin_is_rejected() {
        let board = Board::standard();
        let err = apply_move(&board, &Move::new(sq("e4"), sq("e5"))).unwrap_err();
        assert_eq!(err, MoveError::EmptySquare(sq("e4")));
    }
}
