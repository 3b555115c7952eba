//! Immutable position value and the move maker.
//!
//! A `Position` is never mutated in place: `make` derives a fresh child
//! value. Alongside the mailbox and piece lists it carries the derived
//! state that is expensive to rebuild: the per-piece attack table, the
//! NNUE accumulators, and the Zobrist hash, all updated incrementally.

use std::fmt;

use super::attacks::AttackTable;
use super::byteboard::{Byteboard, PieceList};
use super::geometry;
use super::types::{Bitboard, Color, Move, PieceId, PieceMask, PieceType, Place, Square};
use super::zobrist;
use crate::eval::network::{self, Accumulators};

/// Castling-rights record: for each colour, the a-side and h-side rook
/// squares, or the invalid sentinel when the right is gone. Rook files
/// are arbitrary on the back rank, which covers Chess960.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RookInfo {
    /// [white a-side, white h-side, black a-side, black h-side]
    squares: [Square; 4],
}

impl RookInfo {
    #[must_use]
    pub const fn none() -> Self {
        RookInfo {
            squares: [Square::invalid(); 4],
        }
    }

    #[inline]
    #[must_use]
    pub fn aside(&self, color: Color) -> Square {
        self.squares[color.index() * 2]
    }

    #[inline]
    #[must_use]
    pub fn hside(&self, color: Color) -> Square {
        self.squares[color.index() * 2 + 1]
    }

    pub fn set_aside(&mut self, color: Color, sq: Square) {
        self.squares[color.index() * 2] = sq;
    }

    pub fn set_hside(&mut self, color: Color, sq: Square) {
        self.squares[color.index() * 2 + 1] = sq;
    }

    /// Drop both rights of one colour (the king moved).
    pub fn clear(&mut self, color: Color) {
        self.squares[color.index() * 2] = Square::invalid();
        self.squares[color.index() * 2 + 1] = Square::invalid();
    }

    /// Drop whichever right references `sq` (the rook moved or died).
    pub fn unset(&mut self, color: Color, sq: Square) {
        for i in [color.index() * 2, color.index() * 2 + 1] {
            if self.squares[i] == sq {
                self.squares[i] = Square::invalid();
            }
        }
    }

    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.squares.iter().all(|sq| !sq.is_valid())
    }

    /// XOR of the Zobrist words of every present right.
    #[must_use]
    pub(crate) fn hash(&self) -> u64 {
        let mut h = 0;
        for color in [Color::White, Color::Black] {
            if self.aside(color).is_valid() {
                h ^= zobrist::castle_key(color, 0);
            }
            if self.hside(color).is_valid() {
                h ^= zobrist::castle_key(color, 1);
            }
        }
        h
    }
}

#[derive(Clone, Copy)]
pub struct Position {
    board: Byteboard,
    piece_list_sq: [PieceList<Square>; 2],
    piece_list_ptype: [PieceList<PieceType>; 2],
    rook_info: RookInfo,
    enpassant: Square,
    stm: Color,
    halfmove_clock: u16,
    ply: u16,
    hash: u64,
    attacks: AttackTable,
    accumulators: Accumulators,
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        // Attack table and accumulators are derived state
        self.board == other.board
            && self.piece_list_sq == other.piece_list_sq
            && self.rook_info == other.rook_info
            && self.enpassant == other.enpassant
            && self.stm == other.stm
            && self.halfmove_clock == other.halfmove_clock
            && self.ply == other.ply
            && self.hash == other.hash
    }
}

impl Eq for Position {}

impl Position {
    pub const STARTPOS_FEN: &'static str =
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    /// The standard initial position.
    #[must_use]
    pub fn startpos() -> Position {
        Position::parse(Self::STARTPOS_FEN).expect("startpos FEN is valid")
    }

    pub(crate) fn new_empty() -> Position {
        Position {
            board: Byteboard::empty(),
            piece_list_sq: [PieceList::filled(Square::invalid()); 2],
            piece_list_ptype: [PieceList::filled(PieceType::None); 2],
            rook_info: RookInfo::none(),
            enpassant: Square::invalid(),
            stm: Color::White,
            halfmove_clock: 0,
            ply: 0,
            hash: 0,
            attacks: AttackTable::empty(),
            accumulators: Accumulators::new(network::default_network()),
        }
    }

    // Accessors

    #[inline]
    #[must_use]
    pub fn board(&self) -> &Byteboard {
        &self.board
    }

    #[inline]
    #[must_use]
    pub fn piece_list_sq(&self, color: Color) -> &PieceList<Square> {
        &self.piece_list_sq[color.index()]
    }

    #[inline]
    #[must_use]
    pub fn piece_list_ptype(&self, color: Color) -> &PieceList<PieceType> {
        &self.piece_list_ptype[color.index()]
    }

    #[inline]
    #[must_use]
    pub fn rook_info(&self) -> RookInfo {
        self.rook_info
    }

    #[inline]
    #[must_use]
    pub fn enpassant(&self) -> Square {
        self.enpassant
    }

    #[inline]
    #[must_use]
    pub fn stm(&self) -> Color {
        self.stm
    }

    #[inline]
    #[must_use]
    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    #[inline]
    #[must_use]
    pub fn ply(&self) -> u16 {
        self.ply
    }

    #[inline]
    #[must_use]
    pub fn full_move_counter(&self) -> u16 {
        self.ply / 2 + 1
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    #[must_use]
    pub fn attack_table(&self) -> &AttackTable {
        &self.attacks
    }

    #[inline]
    #[must_use]
    pub fn accumulators(&self) -> &Accumulators {
        &self.accumulators
    }

    #[inline]
    #[must_use]
    pub fn king_sq(&self, color: Color) -> Square {
        self.piece_list_sq[color.index()].get(PieceId::king())
    }

    #[inline]
    #[must_use]
    pub fn piece_on(&self, sq: Square) -> PieceType {
        self.board.read(sq).ptype()
    }

    /// IDs of this colour's pieces of one type (alive entries only).
    #[must_use]
    pub fn piece_mask_of_type(&self, color: Color, ptype: PieceType) -> PieceMask {
        let mut mask = 0u16;
        let sqs = self.piece_list_sq[color.index()].as_array();
        let ptypes = self.piece_list_ptype[color.index()].as_array();
        for i in 0..16 {
            if sqs[i].is_valid() && ptypes[i] == ptype {
                mask |= 1 << i;
            }
        }
        PieceMask(mask)
    }

    /// IDs of this colour's sliders (alive entries only).
    #[must_use]
    pub(crate) fn slider_mask(&self, color: Color) -> PieceMask {
        let mut mask = 0u16;
        let sqs = self.piece_list_sq[color.index()].as_array();
        let ptypes = self.piece_list_ptype[color.index()].as_array();
        for i in 0..16 {
            if sqs[i].is_valid() && ptypes[i].is_slider() {
                mask |= 1 << i;
            }
        }
        PieceMask(mask)
    }

    /// Enemy pieces checking the side to move.
    #[inline]
    #[must_use]
    pub fn checkers(&self) -> PieceMask {
        self.attacks.read(self.stm.invert(), self.king_sq(self.stm))
    }

    #[inline]
    #[must_use]
    pub fn in_check(&self) -> bool {
        !self.checkers().is_empty()
    }

    /// Static evaluation from the side to move's perspective, clamped into
    /// the non-theoretical score range.
    #[must_use]
    pub fn evaluate(&self) -> i32 {
        crate::eval::clamp(network::evaluate_accumulators(
            network::default_network(),
            &self.accumulators,
            self.stm,
        ))
    }

    /// Whether the en-passant square can be hit by a side-to-move pawn;
    /// only then does the en-passant file enter the hash.
    #[must_use]
    pub(crate) fn ep_hash_key(&self) -> u64 {
        if !self.enpassant.is_valid() {
            return 0;
        }
        let pawns = self.piece_mask_of_type(self.stm, PieceType::Pawn);
        if self.attacks.read(self.stm, self.enpassant).and(pawns).is_empty() {
            return 0;
        }
        zobrist::enpassant_key(self.enpassant.file())
    }

    /// Draw material test: bare kings, a single minor piece, or same-coloured
    /// bishops only.
    #[must_use]
    pub fn has_insufficient_material(&self) -> bool {
        let mut minors = 0;
        let mut bishop_squares = Vec::new();
        for color in [Color::White, Color::Black] {
            let sqs = self.piece_list_sq[color.index()].as_array();
            let ptypes = self.piece_list_ptype[color.index()].as_array();
            for i in 0..16 {
                if !sqs[i].is_valid() {
                    continue;
                }
                match ptypes[i] {
                    PieceType::Pawn | PieceType::Rook | PieceType::Queen => return false,
                    PieceType::Knight => minors += 1,
                    PieceType::Bishop => {
                        minors += 1;
                        bishop_squares.push(sqs[i]);
                    }
                    _ => {}
                }
            }
        }
        if minors <= 1 {
            return true;
        }
        // Any number of same-coloured bishops cannot mate
        if bishop_squares.len() == minors {
            let shade = |sq: Square| (sq.file() + sq.rank()) % 2;
            let first = shade(bishop_squares[0]);
            return bishop_squares.iter().all(|&sq| shade(sq) == first);
        }
        false
    }

    // Move making

    /// Derive the position after `m`. The move must be legal.
    #[must_use]
    pub fn make(&self, m: Move) -> Position {
        let mut next = *self;
        next.make_in_place(m);
        next
    }

    fn make_in_place(&mut self, m: Move) {
        let net = network::default_network();
        let us = self.stm;
        let them = us.invert();
        let from = m.from();
        let to = m.to();
        let src = self.board.read(from);
        debug_assert!(!src.is_empty() && src.color() == us, "bad move {m}");

        // Retire the old en-passant contribution before anything shifts.
        self.hash ^= self.ep_hash_key();
        let old_castle_hash = self.rook_info.hash();

        // Squares whose occupancy changes; any piece attacking one of them
        // may need its rays rebuilt.
        let mut changed = [from, to, Square::invalid(), Square::invalid()];
        let mut changed_len = 2;
        // Pieces (id, final square, final type) to rebuild wholesale.
        let mut movers = [(PieceId::king(), Square::invalid(), PieceType::None); 2];
        let mover_count;
        let mut captured_id: Option<PieceId> = None;

        self.halfmove_clock += 1;
        if src.ptype() == PieceType::Pawn || m.is_capture() {
            self.halfmove_clock = 0;
        }

        if m.is_castle() {
            // Castling is king-takes-own-rook: `to` holds the rook.
            let rook_place = self.board.read(to);
            debug_assert!(rook_place.ptype() == PieceType::Rook && rook_place.color() == us);
            let rank = us.back_rank();
            let (king_file, rook_file) = if m.is_castle_aside() { (2, 3) } else { (6, 5) };
            let king_dest = Square::from_file_and_rank(king_file, rank);
            let rook_dest = Square::from_file_and_rank(rook_file, rank);

            self.board.write(from, Place::EMPTY);
            self.board.write(to, Place::EMPTY);
            self.board.write(king_dest, src);
            self.board.write(rook_dest, rook_place);
            self.piece_list_sq[us.index()].set(src.id(), king_dest);
            self.piece_list_sq[us.index()].set(rook_place.id(), rook_dest);

            self.hash ^= zobrist::piece_key(src, from) ^ zobrist::piece_key(src, king_dest);
            self.hash ^=
                zobrist::piece_key(rook_place, to) ^ zobrist::piece_key(rook_place, rook_dest);
            self.accumulators.remove_piece(net, from, PieceType::King, us);
            self.accumulators.add_piece(net, king_dest, PieceType::King, us);
            self.accumulators.remove_piece(net, to, PieceType::Rook, us);
            self.accumulators.add_piece(net, rook_dest, PieceType::Rook, us);

            self.rook_info.clear(us);
            changed[2] = king_dest;
            changed[3] = rook_dest;
            changed_len = 4;
            movers[0] = (src.id(), king_dest, PieceType::King);
            movers[1] = (rook_place.id(), rook_dest, PieceType::Rook);
            mover_count = 2;
            self.enpassant = Square::invalid();
        } else {
            // Remove whatever is captured.
            if m.is_capture() {
                let victim_sq = if m.is_en_passant() {
                    Square::from_file_and_rank(to.file(), if us == Color::White { 4 } else { 3 })
                } else {
                    to
                };
                let victim = self.board.read(victim_sq);
                debug_assert!(!victim.is_empty() && victim.color() == them);
                self.board.write(victim_sq, Place::EMPTY);
                self.piece_list_sq[them.index()].set(victim.id(), Square::invalid());
                self.hash ^= zobrist::piece_key(victim, victim_sq);
                self.accumulators
                    .remove_piece(net, victim_sq, victim.ptype(), them);
                if victim.ptype() == PieceType::Rook {
                    self.rook_info.unset(them, victim_sq);
                }
                captured_id = Some(victim.id());
                if m.is_en_passant() {
                    changed[2] = victim_sq;
                    changed_len = 3;
                }
            }

            // Move (and possibly transform) the piece itself.
            let final_ptype = if m.is_promotion() {
                m.promo_ptype()
            } else {
                src.ptype()
            };
            let dst_place = Place::from(us, final_ptype, src.id());
            self.board.write(from, Place::EMPTY);
            self.board.write(to, dst_place);
            self.piece_list_sq[us.index()].set(src.id(), to);
            self.piece_list_ptype[us.index()].set(src.id(), final_ptype);
            self.hash ^= zobrist::piece_key(src, from) ^ zobrist::piece_key(dst_place, to);
            self.accumulators.remove_piece(net, from, src.ptype(), us);
            self.accumulators.add_piece(net, to, final_ptype, us);

            match src.ptype() {
                PieceType::King => self.rook_info.clear(us),
                PieceType::Rook => self.rook_info.unset(us, from),
                _ => {}
            }

            self.enpassant = if m.is_double_push() {
                Square::from_index((from.index() + to.index()) / 2)
            } else {
                Square::invalid()
            };

            movers[0] = (src.id(), to, final_ptype);
            mover_count = 1;
        }

        self.hash ^= old_castle_hash ^ self.rook_info.hash();
        self.stm = them;
        self.hash ^= zobrist::side_key();
        self.ply += 1;

        self.update_attacks(us, &changed[..changed_len], &movers[..mover_count], captured_id);

        // The new en-passant square hashes in against the updated state.
        self.hash ^= self.ep_hash_key();

        debug_assert_eq!(self.hash, self.slow_hash());
        debug_assert!(self.validate_attacks());
    }

    /// Rebuild the rows of every piece whose sight could have changed: the
    /// pieces that moved, plus every slider the pre-move table shows
    /// attacking a square whose occupancy changed. Non-sliders attacking
    /// those squares keep their rays and are skipped; captured pieces lose
    /// their row outright.
    fn update_attacks(
        &mut self,
        mover_color: Color,
        changed: &[Square],
        movers: &[(PieceId, Square, PieceType)],
        captured_id: Option<PieceId>,
    ) {
        let them = mover_color.invert();
        let mut affected = [PieceMask::empty(); 2];
        for &sq in changed {
            for color in [Color::White, Color::Black] {
                affected[color.index()] =
                    PieceMask(affected[color.index()].0 | self.attacks.read(color, sq).0);
            }
        }

        let mut recompute = [
            affected[0].and(self.slider_mask(Color::White)),
            affected[1].and(self.slider_mask(Color::Black)),
        ];
        for &(id, _, _) in movers {
            recompute[mover_color.index()] =
                PieceMask(recompute[mover_color.index()].0 | id.to_bit());
        }
        if let Some(victim) = captured_id {
            self.attacks.clear_piece(them, victim);
            recompute[them.index()] = recompute[them.index()].without(victim);
        }

        let occupied = self.board.occupied_bitboard();
        for color in [Color::White, Color::Black] {
            for id in recompute[color.index()] {
                let sq = self.piece_list_sq[color.index()].get(id);
                debug_assert!(sq.is_valid());
                let ptype = self.piece_list_ptype[color.index()].get(id);
                self.attacks.recompute_piece(color, id, sq, ptype, occupied);
            }
        }
    }

    // Slow reference paths, used at parse time and by debug assertions.

    /// Rebuild the attack table from scratch.
    pub(crate) fn rebuild_attacks(&mut self) {
        let occupied = self.board.occupied_bitboard();
        let mut attacks = AttackTable::empty();
        for color in [Color::White, Color::Black] {
            let sqs = self.piece_list_sq[color.index()].as_array();
            let ptypes = self.piece_list_ptype[color.index()].as_array();
            for i in 0..16 {
                if sqs[i].is_valid() {
                    attacks.add_piece(
                        color,
                        PieceId::new(i as u8),
                        geometry::piece_attacks(sqs[i], color, ptypes[i], occupied),
                    );
                }
            }
        }
        self.attacks = attacks;
    }

    pub(crate) fn rebuild_accumulators(&mut self) {
        self.accumulators = Accumulators::from_board(&self.board, network::default_network());
    }

    /// Hash recomputed from scratch; must always agree with the
    /// incremental value.
    #[must_use]
    pub fn slow_hash(&self) -> u64 {
        let mut h = 0u64;
        for idx in 0..64 {
            let sq = Square::from_index(idx);
            let place = self.board.read(sq);
            if !place.is_empty() {
                h ^= zobrist::piece_key(place, sq);
            }
        }
        if self.stm == Color::Black {
            h ^= zobrist::side_key();
        }
        h ^= self.rook_info.hash();
        h ^= self.ep_hash_key();
        h
    }

    pub(crate) fn set_hash_from_scratch(&mut self) {
        self.hash = self.slow_hash();
    }

    #[must_use]
    pub(crate) fn validate_attacks(&self) -> bool {
        let mut fresh = *self;
        fresh.rebuild_attacks();
        fresh.attacks == self.attacks
    }

    /// Structural invariants: board and piece lists agree, one king per
    /// side with ID 0, castling rooks in place.
    #[must_use]
    pub fn validate(&self) -> bool {
        for color in [Color::White, Color::Black] {
            let sqs = self.piece_list_sq[color.index()].as_array();
            let ptypes = self.piece_list_ptype[color.index()].as_array();
            if !sqs[0].is_valid() || ptypes[0] != PieceType::King {
                return false;
            }
            for i in 0..16 {
                if sqs[i].is_valid() {
                    let place = self.board.read(sqs[i]);
                    if place.is_empty()
                        || place.color() != color
                        || place.id().index() != i
                        || place.ptype() != ptypes[i]
                    {
                        return false;
                    }
                }
            }
            for side in 0..2 {
                let rook_sq = if side == 0 {
                    self.rook_info.aside(color)
                } else {
                    self.rook_info.hside(color)
                };
                if rook_sq.is_valid() {
                    let place = self.board.read(rook_sq);
                    if place.is_empty() || place.ptype() != PieceType::Rook || place.color() != color
                    {
                        return false;
                    }
                }
            }
        }
        let occupied = self.board.occupied_bitboard();
        let mut listed = Bitboard::EMPTY;
        for color in [Color::White, Color::Black] {
            for &sq in self.piece_list_sq[color.index()].as_array() {
                if sq.is_valid() {
                    listed.set(sq);
                }
            }
        }
        if listed != occupied {
            return false;
        }
        // Checks are delivered to the side to move only
        let them = self.stm.invert();
        self.attacks.read(self.stm, self.king_sq(them)).is_empty()
    }

    // Parse-time construction hooks used by the FEN module.

    pub(crate) fn place_parsed_piece(
        &mut self,
        sq: Square,
        color: Color,
        ptype: PieceType,
        id: PieceId,
    ) {
        self.board.write(sq, Place::from(color, ptype, id));
        self.piece_list_sq[color.index()].set(id, sq);
        self.piece_list_ptype[color.index()].set(id, ptype);
    }

    pub(crate) fn set_state(
        &mut self,
        rook_info: RookInfo,
        enpassant: Square,
        stm: Color,
        halfmove_clock: u16,
        ply: u16,
    ) {
        self.rook_info = rook_info;
        self.enpassant = enpassant;
        self.stm = stm;
        self.halfmove_clock = halfmove_clock;
        self.ply = ply;
    }
}

impl fmt::Display for Position {
    /// Formats as FEN.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", super::fen::format_fen(self))
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({self})")
    }
}
