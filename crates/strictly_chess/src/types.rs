//! Core domain types for chess: colours, pieces and squares.

use serde::{Deserialize, Serialize};

/// Side in the game.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// White (moves first).
    #[display("White")]
    White,
    /// Black.
    #[display("Black")]
    Black,
}

impl Color {
    /// Returns the opposing side.
    pub fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Rank direction pawns of this colour advance in.
    pub fn forward(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    /// Rank holding this colour's king and rooks at the start.
    pub fn back_rank(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    /// Rank this colour's pawns start on.
    pub fn pawn_rank(self) -> u8 {
        match self {
            Color::White => 1,
            Color::Black => 6,
        }
    }

    /// Rank a pawn of this colour promotes on.
    pub fn promotion_rank(self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    /// Side-to-move marker used in board notation.
    pub fn marker(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }
}

/// Kind of piece.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    /// Pawn.
    #[display("pawn")]
    Pawn,
    /// Knight.
    #[display("knight")]
    Knight,
    /// Bishop.
    #[display("bishop")]
    Bishop,
    /// Rook.
    #[display("rook")]
    Rook,
    /// Queen.
    #[display("queen")]
    Queen,
    /// King.
    #[display("king")]
    King,
}

impl PieceKind {
    /// Uppercase letter code for this kind.
    pub fn letter(self) -> char {
        match self {
            PieceKind::Pawn => 'P',
            PieceKind::Knight => 'N',
            PieceKind::Bishop => 'B',
            PieceKind::Rook => 'R',
            PieceKind::Queen => 'Q',
            PieceKind::King => 'K',
        }
    }

    /// Parses a letter code, ignoring case.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'P' => Some(PieceKind::Pawn),
            'N' => Some(PieceKind::Knight),
            'B' => Some(PieceKind::Bishop),
            'R' => Some(PieceKind::Rook),
            'Q' => Some(PieceKind::Queen),
            'K' => Some(PieceKind::King),
            _ => None,
        }
    }

    /// Whether a pawn may promote into this kind.
    pub fn is_promotion_target(self) -> bool {
        matches!(
            self,
            PieceKind::Knight | PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen
        )
    }
}

/// A piece on the board.
///
/// Pieces are plain values. Moving a piece places a fresh copy with
/// `has_moved` set on the destination square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    /// Kind of piece.
    pub kind: PieceKind,
    /// Owner of the piece.
    pub color: Color,
    /// Whether the piece has left its starting square.
    pub has_moved: bool,
}

impl Piece {
    /// Creates an unmoved piece.
    pub fn new(kind: PieceKind, color: Color) -> Self {
        Self {
            kind,
            color,
            has_moved: false,
        }
    }

    /// Returns this piece marked as moved.
    pub fn moved(self) -> Self {
        Self {
            has_moved: true,
            ..self
        }
    }

    /// Letter code: uppercase for White, lowercase for Black.
    pub fn code(self) -> char {
        match self.color {
            Color::White => self.kind.letter(),
            Color::Black => self.kind.letter().to_ascii_lowercase(),
        }
    }

    /// Parses a letter code. The result is unmoved.
    pub fn from_code(code: char) -> Option<Self> {
        let kind = PieceKind::from_letter(code)?;
        let color = if code.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Self::new(kind, color))
    }
}

/// A square on the board.
///
/// Rank 0 is White's back rank ("1"), file 0 is the a-file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square {
    rank: u8,
    file: u8,
}

impl Square {
    /// Creates a square, or `None` when out of bounds.
    pub fn new(rank: u8, file: u8) -> Option<Self> {
        (rank < 8 && file < 8).then_some(Self { rank, file })
    }

    /// Creates a square from indices already known to be in range.
    ///
    /// Indices are wrapped into 0-7.
    pub(crate) const fn at(rank: u8, file: u8) -> Self {
        Self {
            rank: rank & 7,
            file: file & 7,
        }
    }

    /// Rank index (0-7).
    pub fn rank(self) -> u8 {
        self.rank
    }

    /// File index (0-7).
    pub fn file(self) -> u8 {
        self.file
    }

    /// Square reached by stepping `(dr, df)`, if still on the board.
    pub fn offset(self, dr: i8, df: i8) -> Option<Self> {
        let rank = i16::from(self.rank) + i16::from(dr);
        let file = i16::from(self.file) + i16::from(df);
        if (0..8).contains(&rank) && (0..8).contains(&file) {
            Some(Self {
                rank: rank as u8,
                file: file as u8,
            })
        } else {
            None
        }
    }

    /// Parses algebraic coordinates such as `e4`.
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Iterates all 64 squares, a1 first.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..8).flat_map(|rank| (0..8).map(move |file| Square { rank, file }))
    }

    /// Whether the square is a light square.
    pub fn is_light(self) -> bool {
        (self.rank + self.file) % 2 == 1
    }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", (b'a' + self.file) as char, self.rank + 1)
    }
}

/// Error parsing algebraic square coordinates.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum SquareError {
    /// Not exactly a file letter followed by a rank digit.
    #[display("Expected a square like e4, found {:?}", _0)]
    Length(#[error(not(source))] String),

    /// File outside `a..=h`.
    #[display("Invalid file {:?}", _0)]
    File(#[error(not(source))] char),

    /// Rank outside `1..=8`.
    #[display("Invalid rank {:?}", _0)]
    Rank(#[error(not(source))] char),
}

impl std::str::FromStr for Square {
    type Err = SquareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let mut chars = text.chars();
        let (Some(file), Some(rank), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(SquareError::Length(text.to_string()));
        };
        if !('a'..='h').contains(&file) {
            return Err(SquareError::File(file));
        }
        if !('1'..='8').contains(&rank) {
            return Err(SquareError::Rank(rank));
        }
        Ok(Square {
            rank: rank as u8 - b'1',
            file: file as u8 - b'a',
        })
    }
}

impl Serialize for Square {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Square {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_round_trips_algebraic() {
        let sq = Square::parse("e4").expect("valid square");
        assert_eq!(sq.rank(), 3);
        assert_eq!(sq.file(), 4);
        assert_eq!(sq.to_string(), "e4");
    }

    #[test]
    fn test_square_rejects_garbage() {
        assert!(Square::parse("i1").is_none());
        assert!(Square::parse("a9").is_none());
        assert!(Square::parse("e44").is_none());
        assert!(Square::parse("").is_none());
    }

    #[test]
    fn test_square_error_names_the_bad_part() {
        assert_eq!("i1".parse::<Square>(), Err(SquareError::File('i')));
        assert_eq!("a9".parse::<Square>(), Err(SquareError::Rank('9')));
        assert_eq!(
            "e44".parse::<Square>(),
            Err(SquareError::Length("e44".to_string()))
        );
        let err = "".parse::<Square>().unwrap_err();
        assert_eq!(err.to_string(), "Expected a square like e4, found \"\"");
    }

    #[test]
    fn test_offset_stays_on_board() {
        let a1 = Square::parse("a1").expect("valid square");
        assert!(a1.offset(-1, 0).is_none());
        assert_eq!(a1.offset(1, 1), Square::parse("b2"));
    }

    #[test]
    fn test_piece_codes() {
        let knight = Piece::from_code('n').expect("valid code");
        assert_eq!(knight.kind, PieceKind::Knight);
        assert_eq!(knight.color, Color::Black);
        assert_eq!(knight.code(), 'n');
        assert!(Piece::from_code('x').is_none());
    }

    #[test]
    fn test_square_colours() {
        assert!(!Square::parse("a1").expect("valid").is_light());
        assert!(Square::parse("h1").expect("valid").is_light());
    }
}
