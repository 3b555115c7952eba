//! Board representation, move generation, and game state.
//!
//! The board is a 64-byte mailbox of tagged bytes backed by per-colour
//! piece lists with stable IDs, an incrementally maintained per-piece
//! attack table, and a superpiece-ray geometry kernel that answers every
//! line-of-sight question.

mod attacks;
mod byteboard;
mod error;
mod fen;
mod game;
pub mod geometry;
mod movegen;
mod position;
mod types;
mod zobrist;

#[cfg(test)]
mod tests;

pub use attacks::AttackTable;
pub use byteboard::{Byteboard, PieceList};
pub use error::ParseError;
pub use fen::{format_fen, pretty_print};
pub use game::Game;
pub use movegen::MoveGen;
pub use position::{Position, RookInfo};
pub use types::{
    Bitboard, Color, Move, MoveFlags, MoveList, PieceId, PieceMask, PieceType, Place, Square,
};

pub(crate) use types::MAX_MOVES;
