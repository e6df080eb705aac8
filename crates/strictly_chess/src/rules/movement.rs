//! Per-piece movement rules (pseudo-legal generation).
//!
//! Moves produced here obey how each piece moves but may leave the mover's
//! own king attacked. The king-safety filter lives in `rules::legal_moves`.

use super::check::is_attacked;
use crate::{Board, Color, Move, Piece, PieceKind, Square};

pub(crate) const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
];

pub(crate) const KING_OFFSETS: [(i8, i8); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

pub(crate) const ROOK_DIRECTIONS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

pub(crate) const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Pseudo-legal moves for the piece on `from`, regardless of whose turn it is.
pub(crate) fn pseudo_legal_moves(board: &Board, from: Square) -> Vec<Move> {
    let Some(piece) = board.get(from) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    match piece.kind {
        PieceKind::Pawn => pawn_moves(board, from, piece, &mut out),
        PieceKind::Knight => step_moves(board, from, piece.color, &KNIGHT_OFFSETS, &mut out),
        PieceKind::Bishop => ray_moves(board, from, piece.color, &BISHOP_DIRECTIONS, &mut out),
        PieceKind::Rook => ray_moves(board, from, piece.color, &ROOK_DIRECTIONS, &mut out),
        PieceKind::Queen => {
            ray_moves(board, from, piece.color, &ROOK_DIRECTIONS, &mut out);
            ray_moves(board, from, piece.color, &BISHOP_DIRECTIONS, &mut out);
        }
        PieceKind::King => {
            step_moves(board, from, piece.color, &KING_OFFSETS, &mut out);
            castling_moves(board, from, piece, &mut out);
        }
    }
    out
}

fn pawn_moves(board: &Board, from: Square, pawn: Piece, out: &mut Vec<Move>) {
    let forward = pawn.color.forward();
    let mut push = |mv: Move| {
        if mv.to.rank() == pawn.color.promotion_rank() {
            out.push(mv.promoting_to(PieceKind::Queen));
        } else {
            out.push(mv);
        }
    };

    if let Some(one) = from.offset(forward, 0).filter(|sq| board.get(*sq).is_none()) {
        push(Move::new(from, one));

        if from.rank() == pawn.color.pawn_rank() {
            if let Some(two) = one.offset(forward, 0).filter(|sq| board.get(*sq).is_none()) {
                push(Move::new(from, two));
            }
        }
    }

    for df in [-1, 1] {
        let Some(target) = from.offset(forward, df) else {
            continue;
        };
        if board.get(target).is_some_and(|p| p.color != pawn.color) {
            push(Move::new(from, target).capturing());
        }
    }
}

fn step_moves(
    board: &Board,
    from: Square,
    color: Color,
    offsets: &[(i8, i8)],
    out: &mut Vec<Move>,
) {
    for &(dr, df) in offsets {
        let Some(to) = from.offset(dr, df) else {
            continue;
        };
        match board.get(to) {
            None => out.push(Move::new(from, to)),
            Some(p) if p.color != color => out.push(Move::new(from, to).capturing()),
            Some(_) => {}
        }
    }
}

fn ray_moves(
    board: &Board,
    from: Square,
    color: Color,
    directions: &[(i8, i8)],
    out: &mut Vec<Move>,
) {
    for &(dr, df) in directions {
        let mut current = from.offset(dr, df);
        while let Some(to) = current {
            match board.get(to) {
                None => out.push(Move::new(from, to)),
                Some(p) => {
                    if p.color != color {
                        out.push(Move::new(from, to).capturing());
                    }
                    break;
                }
            }
            current = to.offset(dr, df);
        }
    }
}

fn castling_moves(board: &Board, from: Square, king: Piece, out: &mut Vec<Move>) {
    let color = king.color;
    let rank = color.back_rank();
    if king.has_moved || from != Square::at(rank, 4) {
        return;
    }
    let enemy = color.opponent();
    if is_attacked(board, from, enemy) {
        return;
    }

    // (kingside, squares that must be empty, squares the king crosses, destination file)
    let sides: [(bool, &[u8], [u8; 2], u8); 2] =
        [(true, &[5, 6], [5, 6], 6), (false, &[1, 2, 3], [3, 2], 2)];

    for (kingside, empty, transit, dest) in sides {
        if !board.castling_available(color, kingside) {
            continue;
        }
        if empty.iter().any(|&f| board.get(Square::at(rank, f)).is_some()) {
            continue;
        }
        if transit.iter().any(|&f| is_attacked(board, Square::at(rank, f), enemy)) {
            continue;
        }
        out.push(Move::new(from, Square::at(rank, dest)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        Square::parse(s).expect("valid square")
    }

    #[test]
    fn test_knight_from_corner() {
        let board = Board::empty()
            .with_piece(sq("a1"), Some(Piece::new(PieceKind::Knight, Color::White)));
        let moves = pseudo_legal_moves(&board, sq("a1"));
        let mut dests: Vec<String> = moves.iter().map(|m| m.to.to_string()).collect();
        dests.sort();
        assert_eq!(dests, vec!["b3", "c2"]);
    }

    #[test]
    fn test_rook_ray_stops_at_own_piece() {
        let board = Board::empty()
            .with_piece(sq("a1"), Some(Piece::new(PieceKind::Rook, Color::White)))
            .with_piece(sq("a3"), Some(Piece::new(PieceKind::Pawn, Color::White)))
            .with_piece(sq("c1"), Some(Piece::new(PieceKind::Pawn, Color::Black)));
        let moves = pseudo_legal_moves(&board, sq("a1"));
        let mut dests: Vec<String> = moves.iter().map(|m| m.to.to_string()).collect();
        dests.sort();
        assert_eq!(dests, vec!["a2", "b1", "c1"]);
        assert!(moves.iter().find(|m| m.to == sq("c1")).is_some_and(|m| m.is_capture));
    }

    #[test]
    fn test_pawn_promotes_to_queen_by_default() {
        let board =
            Board::empty().with_piece(sq("b7"), Some(Piece::new(PieceKind::Pawn, Color::White)));
        let moves = pseudo_legal_moves(&board, sq("b7"));
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].promotion, Some(PieceKind::Queen));
    }

    #[test]
    fn test_castling_blocked_by_attacked_transit_square() {
        let board = Board::empty()
            .with_piece(sq("e1"), Some(Piece::new(PieceKind::King, Color::White)))
            .with_piece(sq("h1"), Some(Piece::new(PieceKind::Rook, Color::White)))
            .with_piece(sq("f8"), Some(Piece::new(PieceKind::Rook, Color::Black)));
        let moves = pseudo_legal_moves(&board, sq("e1"));
        assert!(!moves.iter().any(|m| m.to == sq("g1")));
    }
}
