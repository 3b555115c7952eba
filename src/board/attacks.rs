//! The per-piece attack table.
//!
//! For each colour, a 64-entry array of 16-bit masks: bit `i` of entry `s`
//! is set exactly when the piece with ID `i` of that colour attacks square
//! `s` under the current occupancy. The table is maintained incrementally
//! by the move maker; move generation, check and pin detection all read
//! from it.

use super::geometry;
use super::types::{Bitboard, Color, PieceId, PieceMask, PieceType, Square};

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AttackTable {
    words: [[u16; 64]; 2],
}

impl AttackTable {
    #[must_use]
    pub const fn empty() -> Self {
        AttackTable {
            words: [[0; 64]; 2],
        }
    }

    /// The set of pieces of `color` attacking `sq`.
    #[inline]
    #[must_use]
    pub fn read(&self, color: Color, sq: Square) -> PieceMask {
        PieceMask(self.words[color.index()][sq.index()])
    }

    /// Remove every attack bit of one piece.
    #[inline]
    pub fn clear_piece(&mut self, color: Color, id: PieceId) {
        let keep = !id.to_bit();
        for word in &mut self.words[color.index()] {
            *word &= keep;
        }
    }

    /// Set one piece's attack bits for every square in `attacks`.
    #[inline]
    pub fn add_piece(&mut self, color: Color, id: PieceId, attacks: Bitboard) {
        let bit = id.to_bit();
        for sq in attacks {
            self.words[color.index()][sq.index()] |= bit;
        }
    }

    /// Squares attacked by any piece of `color`.
    #[inline]
    #[must_use]
    pub fn any_bitboard(&self, color: Color) -> Bitboard {
        self.masked_bitboard(color, PieceMask(!0))
    }

    /// Squares attacked by at least one piece in `mask`.
    #[inline]
    #[must_use]
    pub fn masked_bitboard(&self, color: Color, mask: PieceMask) -> Bitboard {
        let words = &self.words[color.index()];
        let mut bb = 0u64;
        for (i, word) in words.iter().enumerate() {
            bb |= u64::from(word & mask.0 != 0) << i;
        }
        Bitboard(bb)
    }

    /// Rebuild one piece's row from scratch for the given occupancy.
    pub fn recompute_piece(
        &mut self,
        color: Color,
        id: PieceId,
        sq: Square,
        ptype: PieceType,
        occupied: Bitboard,
    ) {
        self.clear_piece(color, id);
        self.add_piece(color, id, geometry::piece_attacks(sq, color, ptype, occupied));
    }
}

impl std::fmt::Debug for AttackTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for color in [Color::White, Color::Black] {
            writeln!(f, "{color}:")?;
            for rank in (0..8).rev() {
                for file in 0..8 {
                    let sq = Square::from_file_and_rank(file, rank);
                    write!(f, "{:04x} ", self.words[color.index()][sq.index()])?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
