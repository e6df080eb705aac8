//! Strictly Chess - chess rules as pure functions over board values.
//!
//! # Architecture
//!
//! - **Types**: colours, pieces, squares and the [`Board`] value
//! - **Rules**: legal-move generation with king safety, move application
//!   and terminal detection
//! - **Board notation**: the six-field string clients exchange with the
//!   authoritative match store
//! - **Notation formatter**: human-readable move history
//! - **Game**: a board plus the repetition table and history
//!
//! Nothing here performs I/O or holds locks. Every rules function takes a
//! `&Board` and returns new values.
//!
//! # Example
//!
//! ```
//! use strictly_chess::{Board, Move, apply_move, board_notation, legal_moves};
//!
//! let board = Board::standard();
//! let e2 = "e2".parse::<strictly_chess::Square>().unwrap();
//! assert_eq!(legal_moves(&board, e2).len(), 2);
//!
//! let next = apply_move(&board, &Move::parse("e2e4").unwrap()).unwrap();
//! assert_eq!(
//!     board_notation::encode(&next),
//!     "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
//! );
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod action;
mod board;
mod game;
mod notation;
mod types;

// Public modules
pub mod board_notation;
pub mod rules;

// Crate-level exports - Core types
pub use action::{Move, MoveError};
pub use board::Board;
pub use types::{Color, Piece, PieceKind, Square, SquareError};

// Crate-level exports - Rules
pub use rules::{
    Termination, all_legal_moves, apply_move, find_legal, has_legal_moves, is_attacked, is_check,
    is_checkmate, is_draw, is_fifty_move_rule, is_insufficient_material, is_stalemate,
    legal_moves, termination,
};

// Crate-level exports - Notation
pub use board_notation::NotationError;
pub use notation::{MoveRecord, NotationFormatter};

// Crate-level exports - Game
pub use game::Game;
