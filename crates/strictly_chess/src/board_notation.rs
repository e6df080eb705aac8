//! Board notation codec.
//!
//! Boards travel over the wire as six-field Forsyth-Edwards strings:
//!
//! ```text
//! rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1
//! ```
//!
//! Placement lists ranks 8 down to 1, uppercase for White, digits for runs
//! of empty squares. En passant is not tracked, so the fourth field is
//! always `-` on output. The decoder also accepts the short two-field form
//! (`placement side`), deriving castling rights from piece placement and
//! defaulting the clocks to `0 1`.
//!
//! Notation does not record which pieces have moved. The decoder rebuilds
//! `has_moved`: pawns off their start rank, kings and rooks without a
//! castling right, and other pieces off their home squares count as moved.

use crate::{Board, Color, Piece, PieceKind, Square};
use tracing::instrument;

/// Notation of the standard starting position.
pub const STARTING_POSITION: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Error decoding a board notation string. Each variant names the field.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum NotationError {
    /// Wrong number of whitespace-separated fields.
    #[display("Expected 2 or 6 fields, found {}", _0)]
    FieldCount(#[error(not(source))] usize),

    /// Malformed piece placement.
    #[display("Invalid piece placement: {}", _0)]
    Placement(#[error(not(source))] String),

    /// Side-to-move marker other than `w` or `b`.
    #[display("Invalid side to move: {}", _0)]
    SideToMove(#[error(not(source))] String),

    /// Malformed castling field.
    #[display("Invalid castling rights: {}", _0)]
    Castling(#[error(not(source))] String),

    /// Malformed en-passant field.
    #[display("Invalid en passant square: {}", _0)]
    EnPassant(#[error(not(source))] String),

    /// Malformed half-move clock.
    #[display("Invalid halfmove clock: {}", _0)]
    HalfmoveClock(#[error(not(source))] String),

    /// Malformed full-move number.
    #[display("Invalid fullmove number: {}", _0)]
    FullmoveNumber(#[error(not(source))] String),

    /// A side does not have exactly one king.
    #[display("{} must have exactly one king, found {}", _0, _1)]
    KingCount(Color, usize),
}

/// Encodes `board` in six-field notation.
pub fn encode(board: &Board) -> String {
    format!(
        "{} {} {} - {} {}",
        placement(board),
        board.side_to_move().marker(),
        castling(board),
        board.halfmove_clock(),
        board.fullmove_number()
    )
}

/// Key identifying a position for repetition counting.
///
/// Placement, side to move and castling rights. Clocks are ignored.
pub fn position_key(board: &Board) -> String {
    format!(
        "{} {} {}",
        placement(board),
        board.side_to_move().marker(),
        castling(board)
    )
}

fn placement(board: &Board) -> String {
    let mut out = String::with_capacity(72);
    for rank in (0..8u8).rev() {
        let mut empty = 0;
        for file in 0..8u8 {
            match board.get(Square::at(rank, file)) {
                Some(piece) => {
                    if empty > 0 {
                        out.push_str(&empty.to_string());
                        empty = 0;
                    }
                    out.push(piece.code());
                }
                None => empty += 1,
            }
        }
        if empty > 0 {
            out.push_str(&empty.to_string());
        }
        if rank > 0 {
            out.push('/');
        }
    }
    out
}

fn castling(board: &Board) -> String {
    let rights: String = [
        (Color::White, true, 'K'),
        (Color::White, false, 'Q'),
        (Color::Black, true, 'k'),
        (Color::Black, false, 'q'),
    ]
    .iter()
    .filter(|(color, kingside, _)| board.castling_available(*color, *kingside))
    .map(|(_, _, letter)| *letter)
    .collect();

    if rights.is_empty() {
        "-".to_string()
    } else {
        rights
    }
}

/// Castling letters granted by the notation, or derived from placement.
struct Rights {
    letters: Option<String>,
}

impl Rights {
    fn allows(&self, color: Color, kingside: bool) -> bool {
        let letter = match (color, kingside) {
            (Color::White, true) => 'K',
            (Color::White, false) => 'Q',
            (Color::Black, true) => 'k',
            (Color::Black, false) => 'q',
        };
        self.letters.as_ref().is_none_or(|l| l.contains(letter))
    }
}

/// Decodes a board from six-field or two-field notation.
///
/// # Errors
///
/// Returns a [`NotationError`] naming the first malformed field, or
/// [`NotationError::KingCount`] when either side lacks exactly one king.
#[instrument(level = "debug")]
pub fn decode(notation: &str) -> Result<Board, NotationError> {
    let fields: Vec<&str> = notation.split_whitespace().collect();
    let (placement_field, side_field) = match fields.as_slice() {
        [placement, side] | [placement, side, _, _, _, _] => (*placement, *side),
        other => return Err(NotationError::FieldCount(other.len())),
    };

    let side = match side_field {
        "w" => Color::White,
        "b" => Color::Black,
        other => return Err(NotationError::SideToMove(other.to_string())),
    };

    let (rights, halfmove, fullmove) = match fields.as_slice() {
        [_, _, castle, en_passant, half, full] => {
            check_en_passant(en_passant)?;
            (
                parse_castling(castle)?,
                parse_clock(half, NotationError::HalfmoveClock)?,
                parse_clock(full, NotationError::FullmoveNumber)?,
            )
        }
        _ => (Rights { letters: None }, 0, 1),
    };

    let mut board = parse_placement(placement_field)?
        .with_side_to_move(side)
        .with_clocks(halfmove, fullmove);

    for color in [Color::White, Color::Black] {
        let kings = board.king_count(color);
        if kings != 1 {
            return Err(NotationError::KingCount(color, kings));
        }
    }

    mark_moved(&mut board, &rights);
    Ok(board)
}

/// En passant is not tracked, but a well-formed target square is tolerated.
fn check_en_passant(field: &str) -> Result<(), NotationError> {
    if field == "-" || Square::parse(field).is_some_and(|sq| sq.rank() == 2 || sq.rank() == 5) {
        Ok(())
    } else {
        Err(NotationError::EnPassant(field.to_string()))
    }
}

fn parse_castling(field: &str) -> Result<Rights, NotationError> {
    if field == "-" {
        return Ok(Rights {
            letters: Some(String::new()),
        });
    }
    let valid = !field.is_empty()
        && field.chars().all(|c| "KQkq".contains(c))
        && field.len() <= 4;
    if valid {
        Ok(Rights {
            letters: Some(field.to_string()),
        })
    } else {
        Err(NotationError::Castling(field.to_string()))
    }
}

fn parse_clock(
    field: &str,
    error: impl FnOnce(String) -> NotationError,
) -> Result<u32, NotationError> {
    field.parse::<u32>().map_err(|_| error(field.to_string()))
}

fn parse_placement(field: &str) -> Result<Board, NotationError> {
    let ranks: Vec<&str> = field.split('/').collect();
    if ranks.len() != 8 {
        return Err(NotationError::Placement(format!(
            "expected 8 ranks, found {}",
            ranks.len()
        )));
    }

    let mut board = Board::empty();
    for (row, text) in ranks.iter().enumerate() {
        let rank = 7 - row as u8;
        let mut file = 0u8;
        for ch in text.chars() {
            if let Some(run) = ch.to_digit(10) {
                if !(1..=8).contains(&run) {
                    return Err(NotationError::Placement(format!("bad empty run '{ch}'")));
                }
                file += run as u8;
            } else {
                let piece = Piece::from_code(ch)
                    .ok_or_else(|| NotationError::Placement(format!("unknown piece '{ch}'")))?;
                let square = Square::new(rank, file).ok_or_else(|| {
                    NotationError::Placement(format!("rank {} overflows", rank + 1))
                })?;
                board.put(square, Some(piece));
                file += 1;
            }
            if file > 8 {
                return Err(NotationError::Placement(format!(
                    "rank {} overflows",
                    rank + 1
                )));
            }
        }
        if file != 8 {
            return Err(NotationError::Placement(format!(
                "rank {} has {} files",
                rank + 1,
                file
            )));
        }
    }
    Ok(board)
}

const HOME_FILES: [(PieceKind, &[u8]); 3] = [
    (PieceKind::Knight, &[1, 6]),
    (PieceKind::Bishop, &[2, 5]),
    (PieceKind::Queen, &[3]),
];

fn mark_moved(board: &mut Board, rights: &Rights) {
    let snapshot: Vec<(Square, Piece)> = board.pieces().collect();
    for (square, piece) in snapshot {
        let color = piece.color;
        let on_back_rank = square.rank() == color.back_rank();
        let unmoved = match piece.kind {
            PieceKind::Pawn => square.rank() == color.pawn_rank(),
            PieceKind::King => {
                on_back_rank
                    && square.file() == 4
                    && (rights.allows(color, true) || rights.allows(color, false))
            }
            PieceKind::Rook => {
                let king_home = board
                    .get(Square::at(color.back_rank(), 4))
                    .is_some_and(|k| k.kind == PieceKind::King && k.color == color);
                on_back_rank
                    && king_home
                    && match square.file() {
                        7 => rights.allows(color, true),
                        0 => rights.allows(color, false),
                        _ => false,
                    }
            }
            kind => {
                on_back_rank
                    && HOME_FILES
                        .iter()
                        .any(|(k, files)| *k == kind && files.contains(&square.file()))
            }
        };
        if !unmoved {
            board.put(square, Some(piece.moved()));
        }
    }
}

impl std::str::FromStr for Board {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_position_encodes() {
        assert_eq!(encode(&Board::standard()), STARTING_POSITION);
    }

    #[test]
    fn test_two_field_form_defaults_clocks() {
        let board = decode("4k3/8/8/8/8/8/8/4K2R b").expect("valid notation");
        assert_eq!(board.side_to_move(), Color::Black);
        assert_eq!(board.halfmove_clock(), 0);
        assert_eq!(board.fullmove_number(), 1);
        assert!(board.castling_available(Color::White, true));
    }

    #[test]
    fn test_castling_field_controls_has_moved() {
        let board = decode("r3k2r/8/8/8/8/8/8/R3K2R w Kq - 3 20").expect("valid notation");
        assert!(board.castling_available(Color::White, true));
        assert!(!board.castling_available(Color::White, false));
        assert!(!board.castling_available(Color::Black, true));
        assert!(board.castling_available(Color::Black, false));
        assert_eq!(encode(&board), "r3k2r/8/8/8/8/8/8/R3K2R w Kq - 3 20");
    }

    #[test]
    fn test_errors_name_the_field() {
        assert!(matches!(decode("8/8/8 w"), Err(NotationError::Placement(_))));
        assert!(matches!(
            decode("4k3/8/8/8/8/8/8/4K3 x"),
            Err(NotationError::SideToMove(_))
        ));
        assert!(matches!(
            decode("4k3/8/8/8/8/8/8/4K3 w - - z 1"),
            Err(NotationError::HalfmoveClock(_))
        ));
        assert!(matches!(
            decode("4k3/8/8/8/8/8/8/4K3 w XY - 0 1"),
            Err(NotationError::Castling(_))
        ));
        assert!(matches!(decode("4k3/8/8/8/8/8/8/4K3 w -"), Err(NotationError::FieldCount(3))));
    }

    #[test]
    fn test_missing_king_is_rejected() {
        assert_eq!(
            decode("8/8/8/8/8/8/8/4K3 w"),
            Err(NotationError::KingCount(Color::Black, 0))
        );
    }
}
