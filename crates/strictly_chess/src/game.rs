//! A game in progress: board, repetition table and move history.

use crate::board_notation::{self, NotationError};
use crate::rules::{self, Termination};
use crate::{Board, Move, MoveError, MoveRecord, Square};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Chess game tracking everything the board alone cannot.
///
/// The board is replaced wholesale on each move. The repetition table
/// counts positions by placement, side to move and castling rights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    board: Board,
    repetitions: HashMap<String, usize>,
    history: Vec<MoveRecord>,
    termination: Option<Termination>,
}

impl Game {
    /// Starts a game from the standard position.
    #[instrument]
    pub fn new() -> Self {
        Self::from_board(Board::standard())
    }

    /// Starts a game from an arbitrary board.
    ///
    /// The board counts as seen once; the history starts empty.
    pub fn from_board(board: Board) -> Self {
        let mut repetitions = HashMap::new();
        repetitions.insert(board_notation::position_key(&board), 1);
        let termination = rules::termination(&board);
        Self {
            board,
            repetitions,
            history: Vec::new(),
            termination,
        }
    }

    /// Starts a game from board notation.
    ///
    /// # Errors
    ///
    /// Returns the [`NotationError`] from decoding.
    pub fn from_notation(notation: &str) -> Result<Self, NotationError> {
        board_notation::decode(notation).map(Self::from_board)
    }

    /// Current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Current board in six-field notation.
    pub fn notation(&self) -> String {
        board_notation::encode(&self.board)
    }

    /// Moves played so far.
    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    /// How the game ended, if it has.
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Whether the game has ended.
    pub fn is_over(&self) -> bool {
        self.termination.is_some()
    }

    /// Legal moves for the piece on `square`.
    pub fn legal_moves(&self, square: Square) -> Vec<Move> {
        if self.is_over() {
            return Vec::new();
        }
        rules::legal_moves(&self.board, square)
    }

    /// Plays `mv` for the side to move.
    ///
    /// The capture flag is taken from the board, so callers may pass a move
    /// parsed from user input. Returns the termination if the move ended
    /// the game.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::GameOver`] once the game has ended, and
    /// [`MoveError::EmptySquare`], [`MoveError::WrongColor`] or
    /// [`MoveError::Illegal`] when the move is not legal here. The game is
    /// unchanged on error.
    #[instrument(skip_all, fields(mv = %mv, side = %self.board.side_to_move()))]
    pub fn play(&mut self, mv: Move) -> Result<Option<Termination>, MoveError> {
        if self.is_over() {
            return Err(MoveError::GameOver);
        }
        let piece = self
            .board
            .get(mv.from)
            .ok_or(MoveError::EmptySquare(mv.from))?;
        if piece.color != self.board.side_to_move() {
            return Err(MoveError::WrongColor(mv.from));
        }
        let legal = rules::find_legal(&self.board, &mv).ok_or(MoveError::Illegal(mv))?;

        let next = rules::apply_move(&self.board, &legal)?;
        let ply = self.history.len() + 1;
        self.history.push(MoveRecord::new(ply, piece, legal));

        let key = board_notation::position_key(&next);
        let seen = self.repetitions.entry(key).or_insert(0);
        *seen += 1;
        let repeated = *seen >= rules::draw::REPETITION_LIMIT;

        self.termination = rules::termination(&next).or_else(|| {
            repeated.then_some(Termination::ThreefoldRepetition)
        });
        self.board = next;

        debug!(ply, notation = %self.notation(), "Move played");
        if let Some(end) = self.termination {
            info!(termination = %end, "Game over");
        }
        Ok(self.termination)
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, PieceKind};

    fn mv(s: &str) -> Move {
        Move::parse(s).expect("valid move")
    }

    #[test]
    fn test_rejected_move_leaves_game_untouched() {
        let mut game = Game::new();
        let before = game.clone();
        assert_eq!(game.play(mv("e2e5")), Err(MoveError::Illegal(mv("e2e5"))));
        assert_eq!(game.play(mv("e7e5")), Err(MoveError::WrongColor(mv("e7e5").from)));
        assert_eq!(game, before);
    }

    #[test]
    fn test_capture_flag_comes_from_board() {
        let mut game = Game::new();
        for m in ["e2e4", "d7d5"] {
            game.play(mv(m)).expect("legal");
        }
        game.play(mv("e4d5")).expect("legal");
        let last = game.history().last().expect("recorded");
        assert!(last.mv.is_capture);
        assert_eq!(last.text, "White pawn e4xd5");
    }

    #[test]
    fn test_fools_mate() {
        let mut game = Game::new();
        for m in ["f2f3", "e7e5", "g2g4"] {
            assert_eq!(game.play(mv(m)), Ok(None));
        }
        let end = game.play(mv("d8h4")).expect("legal");
        assert_eq!(end, Some(Termination::Checkmate { winner: Color::Black }));
        assert_eq!(game.play(mv("a2a3")), Err(MoveError::GameOver));
    }

    #[test]
    fn test_threefold_repetition() {
        let mut game = Game::new();
        let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];
        for m in shuffle {
            assert_eq!(game.play(mv(m)), Ok(None));
        }
        // Start position seen twice; the next full cycle makes it three.
        for m in &shuffle[..3] {
            assert_eq!(game.play(mv(m)), Ok(None));
        }
        assert_eq!(game.play(mv("f6g8")), Ok(Some(Termination::ThreefoldRepetition)));
    }

    #[test]
    fn test_promotion_defaults_to_queen() {
        let mut game = Game::from_notation("7k/P7/8/8/8/8/8/K7 w - - 0 1").expect("valid");
        game.play(mv("a7a8")).expect("legal");
        let square = Square::parse("a8").expect("valid");
        assert_eq!(game.board().get(square).map(|p| p.kind), Some(PieceKind::Queen));
    }
}
