//! 8x8 chess board.

use super::types::{Color, Piece, PieceKind, Square};
use tracing::instrument;

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

/// Piece placement plus the side to move and move clocks.
///
/// A `Board` is a value. Rules functions take `&Board` and return new
/// boards; nothing mutates a board that has been handed out.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    /// Grid indexed `[rank][file]`.
    squares: [[Option<Piece>; 8]; 8],
    side_to_move: Color,
    /// Plies since the last capture or pawn move.
    halfmove_clock: u32,
    /// Starts at 1, incremented after Black moves.
    fullmove_number: u32,
}

impl Board {
    /// Creates a board with no pieces, White to move.
    pub fn empty() -> Self {
        Self {
            squares: [[None; 8]; 8],
            side_to_move: Color::White,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Creates the standard starting position.
    #[instrument]
    pub fn standard() -> Self {
        let mut board = Self::empty();
        for (file, kind) in BACK_RANK.iter().enumerate() {
            let file = file as u8;
            for color in [Color::White, Color::Black] {
                board.squares[color.back_rank() as usize][file as usize] =
                    Some(Piece::new(*kind, color));
                board.squares[color.pawn_rank() as usize][file as usize] =
                    Some(Piece::new(PieceKind::Pawn, color));
            }
        }
        board
    }

    /// Gets the piece on a square.
    pub fn get(&self, square: Square) -> Option<Piece> {
        self.squares[square.rank() as usize][square.file() as usize]
    }

    /// Returns a copy with `square` set to `piece`.
    pub fn with_piece(&self, square: Square, piece: Option<Piece>) -> Self {
        let mut next = self.clone();
        next.put(square, piece);
        next
    }

    /// Returns a copy with a different side to move.
    pub fn with_side_to_move(&self, side: Color) -> Self {
        Self {
            side_to_move: side,
            ..self.clone()
        }
    }

    /// Returns a copy with the given move clocks.
    pub fn with_clocks(&self, halfmove_clock: u32, fullmove_number: u32) -> Self {
        Self {
            halfmove_clock,
            fullmove_number,
            ..self.clone()
        }
    }

    pub(crate) fn put(&mut self, square: Square, piece: Option<Piece>) {
        self.squares[square.rank() as usize][square.file() as usize] = piece;
    }

    pub(crate) fn set_side_to_move(&mut self, side: Color) {
        self.side_to_move = side;
    }

    pub(crate) fn set_clocks(&mut self, halfmove_clock: u32, fullmove_number: u32) {
        self.halfmove_clock = halfmove_clock;
        self.fullmove_number = fullmove_number;
    }

    /// Side whose turn it is.
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// Plies since the last capture or pawn move.
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    /// Full-move number.
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// Iterates occupied squares.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(|sq| self.get(sq).map(|p| (sq, p)))
    }

    /// Iterates squares holding pieces of `color`.
    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.pieces().filter(move |(_, p)| p.color == color)
    }

    /// Locates the king of `color`.
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces_of(color)
            .find(|(_, p)| p.kind == PieceKind::King)
            .map(|(sq, _)| sq)
    }

    /// Counts kings of `color`.
    pub fn king_count(&self, color: Color) -> usize {
        self.pieces_of(color)
            .filter(|(_, p)| p.kind == PieceKind::King)
            .count()
    }

    /// Whether `color` may still castle on the given side.
    ///
    /// Only checks that the king and rook are unmoved on their home squares.
    pub fn castling_available(&self, color: Color, kingside: bool) -> bool {
        let rank = color.back_rank();
        let rook_file = if kingside { 7 } else { 0 };
        let home = |file: u8, kind: PieceKind| {
            Square::new(rank, file)
                .and_then(|sq| self.get(sq))
                .is_some_and(|p| p.kind == kind && p.color == color && !p.has_moved)
        };
        home(4, PieceKind::King) && home(rook_file, PieceKind::Rook)
    }

    /// Formats the board as a human-readable grid, rank 8 at the top.
    pub fn display(&self) -> String {
        let mut out = String::new();
        for rank in (0..8u8).rev() {
            out.push((b'1' + rank) as char);
            out.push(' ');
            for file in 0..8u8 {
                let symbol = Square::new(rank, file)
                    .and_then(|sq| self.get(sq))
                    .map_or('.', Piece::code);
                out.push(symbol);
                if file < 7 {
                    out.push(' ');
                }
            }
            out.push('\n');
        }
        out.push_str("  a b c d e f g h");
        out
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}
