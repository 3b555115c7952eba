//! Zobrist hashing tables.
//!
//! Deterministically seeded so hashes are stable across runs and hosts.

use once_cell::sync::Lazy;
use rand::prelude::*;

use super::types::{Color, Place, Square};

pub(crate) struct ZobristTables {
    /// Indexed by the mailbox byte's high nibble (colour bit + piece type),
    /// then square. Rows for the empty and unused piece-type codes stay
    /// zero so hashing an empty square is a no-op.
    pub piece: [[u64; 64]; 16],
    /// Indexed by en-passant file.
    pub enpassant: [u64; 8],
    /// One word per castling right: wq, wk, bq, bk.
    pub castle: [u64; 4],
    /// XORed in when black is to move.
    pub side_to_move: u64,
}

pub(crate) static ZOBRIST: Lazy<ZobristTables> = Lazy::new(|| {
    let mut rng = StdRng::seed_from_u64(0x8588_A96C_AD5E_3985);
    let mut piece = [[0u64; 64]; 16];
    for (nibble, row) in piece.iter_mut().enumerate() {
        // 0b?000 is the empty code, 0b?100 is unused in the type encoding
        if nibble & 0b0111 == 0b000 || nibble & 0b0111 == 0b100 {
            continue;
        }
        for key in row.iter_mut() {
            *key = rng.gen();
        }
    }
    let mut enpassant = [0u64; 8];
    for key in &mut enpassant {
        *key = rng.gen();
    }
    let mut castle = [0u64; 4];
    for key in &mut castle {
        *key = rng.gen();
    }
    let side_to_move = rng.gen();
    ZobristTables {
        piece,
        enpassant,
        castle,
        side_to_move,
    }
});

/// Hash contribution of one piece on one square.
#[inline]
pub(crate) fn piece_key(place: Place, sq: Square) -> u64 {
    ZOBRIST.piece[place.hash_index()][sq.index()]
}

#[inline]
pub(crate) fn enpassant_key(file: u8) -> u64 {
    ZOBRIST.enpassant[file as usize]
}

/// One castling-right word; `side` 0 = a-side, 1 = h-side.
#[inline]
pub(crate) fn castle_key(color: Color, side: usize) -> u64 {
    ZOBRIST.castle[color.index() * 2 + side]
}

#[inline]
pub(crate) fn side_key() -> u64 {
    ZOBRIST.side_to_move
}
