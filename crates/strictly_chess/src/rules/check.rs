//! Attack and check detection.

use super::movement::{BISHOP_DIRECTIONS, KING_OFFSETS, KNIGHT_OFFSETS, ROOK_DIRECTIONS};
use crate::{Board, Color, PieceKind, Square};

/// Whether any piece of `attacker` attacks `target`.
///
/// Works backwards from the target: looks for a knight a knight's jump
/// away, a king adjacent, a pawn diagonally behind, and the first piece
/// along each ray.
pub fn is_attacked(board: &Board, target: Square, attacker: Color) -> bool {
    let holds = |sq: Option<Square>, kinds: &[PieceKind]| {
        sq.and_then(|sq| board.get(sq))
            .is_some_and(|p| p.color == attacker && kinds.contains(&p.kind))
    };

    if KNIGHT_OFFSETS
        .iter()
        .any(|&(dr, df)| holds(target.offset(dr, df), &[PieceKind::Knight]))
    {
        return true;
    }

    if KING_OFFSETS
        .iter()
        .any(|&(dr, df)| holds(target.offset(dr, df), &[PieceKind::King]))
    {
        return true;
    }

    // A pawn attacks diagonally forward, so it sits one rank behind the target.
    let behind = -attacker.forward();
    if [-1, 1]
        .iter()
        .any(|&df| holds(target.offset(behind, df), &[PieceKind::Pawn]))
    {
        return true;
    }

    let ray_hit = |directions: &[(i8, i8)], kinds: &[PieceKind]| {
        directions.iter().any(|&(dr, df)| {
            let mut current = target.offset(dr, df);
            while let Some(sq) = current {
                if let Some(piece) = board.get(sq) {
                    return piece.color == attacker && kinds.contains(&piece.kind);
                }
                current = sq.offset(dr, df);
            }
            false
        })
    };

    ray_hit(&ROOK_DIRECTIONS, &[PieceKind::Rook, PieceKind::Queen])
        || ray_hit(&BISHOP_DIRECTIONS, &[PieceKind::Bishop, PieceKind::Queen])
}

/// Whether `color`'s king is attacked.
///
/// A board without a king for `color` is never in check.
pub fn is_check(board: &Board, color: Color) -> bool {
    board
        .king_square(color)
        .is_some_and(|king| is_attacked(board, king, color.opponent()))
}
