//! Legal move generation.
//!
//! Generation is driven by the attack table: for a destination square,
//! the table directly names every friendly piece that can go there, so
//! the generator walks destinations rather than pieces. Pawn pushes come
//! from shift masks instead, since pushes are not attacks.
//!
//! Only strictly legal moves are emitted. Pins are resolved with per-piece
//! allowed-destination masks, en passant gets the clearance-pin scan, and
//! king moves are verified against attack recomputation with the king
//! lifted off the board.

use super::geometry;
use super::position::Position;
use super::types::{
    Bitboard, Color, Move, MoveFlags, MoveList, PieceId, PieceMask, PieceType, Square,
};

const PROMO_FLAGS: [MoveFlags; 4] = [
    MoveFlags::PromoQueen,
    MoveFlags::PromoKnight,
    MoveFlags::PromoRook,
    MoveFlags::PromoBishop,
];

const CAP_PROMO_FLAGS: [MoveFlags; 4] = [
    MoveFlags::CapPromoQueen,
    MoveFlags::CapPromoKnight,
    MoveFlags::CapPromoRook,
    MoveFlags::CapPromoBishop,
];

/// Pin state for the side to move: pinned pieces may only move along
/// their pin ray (king side exclusive, pinning slider inclusive).
struct Pins {
    pinned: PieceMask,
    allowed: [Bitboard; 16],
}

impl Pins {
    #[inline]
    fn allowed(&self, id: PieceId) -> Bitboard {
        if self.pinned.has(id) {
            self.allowed[id.index()]
        } else {
            Bitboard::ALL
        }
    }
}

pub struct MoveGen<'a> {
    position: &'a Position,
    us: Color,
    them: Color,
    king_sq: Square,
    occupied: Bitboard,
    empty: Bitboard,
    enemy: Bitboard,
    friendly: Bitboard,
    /// Squares attacked by any enemy piece (pre-move occupancy).
    danger: Bitboard,
    pawn_mask: PieceMask,
    pins: Pins,
    checkers: PieceMask,
}

impl<'a> MoveGen<'a> {
    #[must_use]
    pub fn new(position: &'a Position) -> Self {
        let us = position.stm();
        let them = us.invert();
        let king_sq = position.king_sq(us);
        let occupied = position.board().occupied_bitboard();
        let friendly = position.board().color_bitboard(us);
        let enemy = position.board().color_bitboard(them);
        let danger = position.attack_table().any_bitboard(them);
        let pawn_mask = position.piece_mask_of_type(us, PieceType::Pawn);
        let pins = Self::compute_pins(position, us, king_sq);
        let checkers = position.checkers();
        MoveGen {
            position,
            us,
            them,
            king_sq,
            occupied,
            empty: !occupied,
            enemy,
            friendly,
            danger,
            pawn_mask,
            pins,
            checkers,
        }
    }

    /// Walk the king's eight rays: a lone friendly piece in front of an
    /// enemy slider of the matching kind is pinned to that ray.
    fn compute_pins(position: &Position, us: Color, king_sq: Square) -> Pins {
        let mut pins = Pins {
            pinned: PieceMask::empty(),
            allowed: [Bitboard::EMPTY; 16],
        };
        let rays = geometry::superpiece_rays(king_sq);
        for group in 0..8 {
            let (df, dr) = geometry::dir::STEPS[group];
            let diagonal = df != 0 && dr != 0;
            let mut ray = Bitboard::EMPTY;
            let mut blocker: Option<PieceId> = None;
            for distance in 1..8 {
                let slot = group * 8 + distance;
                if rays.valid >> slot & 1 == 0 {
                    break;
                }
                let sq = Square::from_index(rays.coords[slot] as usize);
                ray.set(sq);
                let place = position.board().read(sq);
                if place.is_empty() {
                    continue;
                }
                if place.color() == us {
                    if blocker.is_some() {
                        break;
                    }
                    blocker = Some(place.id());
                    continue;
                }
                if let Some(id) = blocker {
                    let pt = place.ptype();
                    let pin = if diagonal {
                        pt == PieceType::Bishop || pt == PieceType::Queen
                    } else {
                        pt == PieceType::Rook || pt == PieceType::Queen
                    };
                    if pin {
                        pins.pinned = PieceMask(pins.pinned.0 | id.to_bit());
                        pins.allowed[id.index()] = ray;
                    }
                }
                break;
            }
        }
        pins
    }

    /// Generate every legal move.
    pub fn generate(&self, moves: &mut MoveList) {
        match self.checkers.count() {
            0 => self.generate_no_checkers(moves),
            1 => self.generate_one_checker(moves),
            _ => self.king_moves(moves),
        }
    }

    /// Generate captures and promotions only (the quiescence set). Falls
    /// back to full evasion generation when in check.
    pub fn generate_noisy(&self, moves: &mut MoveList) {
        if !self.checkers.is_empty() {
            self.generate(moves);
            return;
        }
        self.captures(moves, Bitboard::ALL);
        self.enpassant_moves(moves);
        self.king_moves_filtered(moves, self.enemy);
        self.pawn_pushes(moves, promo_zone(self.us));
    }

    #[must_use]
    pub fn in_check(&self) -> bool {
        !self.checkers.is_empty()
    }

    fn generate_no_checkers(&self, moves: &mut MoveList) {
        self.captures(moves, Bitboard::ALL);
        self.enpassant_moves(moves);
        self.king_moves_filtered(moves, self.enemy);
        self.castles(moves);
        self.quiets(moves, self.empty);
        self.king_moves_filtered(moves, self.empty);
        self.pawn_pushes(moves, Bitboard::ALL);
    }

    fn generate_one_checker(&self, moves: &mut MoveList) {
        self.king_moves(moves);

        let checker_id = self.checkers.lsb();
        let checker_sq = self.position.piece_list_sq(self.them).get(checker_id);
        let checker_pt = self.position.piece_list_ptype(self.them).get(checker_id);

        // Capture the checker with anything but the king.
        self.captures(moves, Bitboard::from_square(checker_sq));

        // A double-pushed pawn checker may also die en passant.
        let ep = self.position.enpassant();
        if ep.is_valid()
            && checker_pt == PieceType::Pawn
            && ep.file() == checker_sq.file()
            && checker_sq == ep_victim_square(self.us, ep)
        {
            self.enpassant_moves(moves);
        }

        // Interpose on the checking ray.
        if checker_pt.is_slider() {
            let between = geometry::squares_between(self.king_sq, checker_sq);
            if !between.is_empty() {
                self.quiets(moves, between);
                self.pawn_pushes(moves, between);
            }
        }
    }

    /// Captures of enemy pieces on `targets` by non-king pieces.
    fn captures(&self, moves: &mut MoveList, targets: Bitboard) {
        let promo = promo_zone(self.us);
        for victim_sq in self.enemy & targets {
            let attackers = self
                .position
                .attack_table()
                .read(self.us, victim_sq)
                .without(PieceId::king());
            for id in attackers {
                if !self.pins.allowed(id).has(victim_sq) {
                    continue;
                }
                let from = self.position.piece_list_sq(self.us).get(id);
                if self.pawn_mask.has(id) && promo.has(victim_sq) {
                    for flag in CAP_PROMO_FLAGS {
                        moves.push(Move::make(from, victim_sq, flag));
                    }
                } else {
                    moves.push(Move::make(from, victim_sq, MoveFlags::Capture));
                }
            }
        }
    }

    /// Quiet non-pawn, non-king moves onto `targets`.
    fn quiets(&self, moves: &mut MoveList, targets: Bitboard) {
        let movers = PieceMask(!self.pawn_mask.0).without(PieceId::king());
        let active = self.position.attack_table().masked_bitboard(self.us, movers);
        for to in active & self.empty & targets {
            for id in self.position.attack_table().read(self.us, to).and(movers) {
                if !self.pins.allowed(id).has(to) {
                    continue;
                }
                let from = self.position.piece_list_sq(self.us).get(id);
                moves.push(Move::make(from, to, MoveFlags::Normal));
            }
        }
    }

    /// King moves onto `targets` outside check. The pre-move danger map is
    /// exact here: a slider ray can only pierce the king when the king is
    /// already in check.
    fn king_moves_filtered(&self, moves: &mut MoveList, targets: Bitboard) {
        let king_reach = self
            .position
            .attack_table()
            .masked_bitboard(self.us, PieceMask::king());
        for to in king_reach & targets & !self.friendly {
            if self.danger.has(to) {
                continue;
            }
            let flag = if self.enemy.has(to) {
                MoveFlags::Capture
            } else {
                MoveFlags::Normal
            };
            moves.push(Move::make(self.king_sq, to, flag));
        }
    }

    /// King evasions: safety is re-verified with the king lifted off the
    /// occupancy so checking-slider rays extend through its old square.
    fn king_moves(&self, moves: &mut MoveList) {
        let king_reach = self
            .position
            .attack_table()
            .masked_bitboard(self.us, PieceMask::king());
        let without_king = self.occupied ^ Bitboard::from_square(self.king_sq);
        for to in king_reach & !self.friendly {
            if self
                .position
                .board()
                .square_attacked(to, self.them, without_king)
            {
                continue;
            }
            let flag = if self.enemy.has(to) {
                MoveFlags::Capture
            } else {
                MoveFlags::Normal
            };
            moves.push(Move::make(self.king_sq, to, flag));
        }
    }

    fn enpassant_moves(&self, moves: &mut MoveList) {
        let ep = self.position.enpassant();
        if !ep.is_valid() {
            return;
        }
        let attackers = self.position.attack_table().read(self.us, ep).and(self.pawn_mask);
        if attackers.is_empty() {
            return;
        }
        let victim = ep_victim_square(self.us, ep);
        let count = attackers.count();
        for id in attackers {
            if !self.pins.allowed(id).has(ep) {
                continue;
            }
            let from = self.position.piece_list_sq(self.us).get(id);
            if !self.ep_clearance_ok(from, victim, count) {
                continue;
            }
            moves.push(Move::make(from, ep, MoveFlags::EnPassant));
        }
    }

    /// The clearance pin: removing both the capturing pawn and the victim
    /// may expose a rank attack on the king that neither piece alone
    /// blocked. With two candidate capturers the other one stays behind as
    /// a blocker, so the capture is always safe.
    fn ep_clearance_ok(&self, from: Square, victim: Square, attacker_count: u32) -> bool {
        if attacker_count > 1 || victim.rank() != self.king_sq.rank() {
            return true;
        }
        let step: i8 = if victim.file() < self.king_sq.file() {
            -1
        } else {
            1
        };
        let mut file = self.king_sq.file() as i8 + step;
        while (0..8).contains(&file) {
            let sq = Square::from_file_and_rank(file as u8, self.king_sq.rank());
            let place = self.position.board().read(sq);
            if place.is_empty() || sq == victim || sq == from {
                file += step;
                continue;
            }
            return place.color() == self.us
                || (place.ptype() != PieceType::Rook && place.ptype() != PieceType::Queen);
        }
        true
    }

    fn castles(&self, moves: &mut MoveList) {
        if self.castle_legal(true) {
            let rook = self.position.rook_info().aside(self.us);
            moves.push(Move::make(self.king_sq, rook, MoveFlags::CastleAside));
        }
        if self.castle_legal(false) {
            let rook = self.position.rook_info().hside(self.us);
            moves.push(Move::make(self.king_sq, rook, MoveFlags::CastleHside));
        }
    }

    /// Castling requires an existing right, a clear corridor for both
    /// pieces (ignoring the two castling pieces themselves), a safe king
    /// path, and a king destination that stays safe once the rook leaves
    /// its origin square.
    fn castle_legal(&self, aside: bool) -> bool {
        if self.in_check() {
            return false;
        }
        let rook_sq = if aside {
            self.position.rook_info().aside(self.us)
        } else {
            self.position.rook_info().hside(self.us)
        };
        if !rook_sq.is_valid() {
            return false;
        }
        let rank = self.us.back_rank();
        let (king_file, rook_file) = if aside { (2, 3) } else { (6, 5) };
        let king_dest = Square::from_file_and_rank(king_file, rank);
        let rook_dest = Square::from_file_and_rank(rook_file, rank);

        let king_bb = Bitboard::from_square(self.king_sq);
        let rook_bb = Bitboard::from_square(rook_sq);
        let rook_ray = backrank_ray(rook_sq, rook_dest);
        let king_ray = backrank_ray(self.king_sq, king_dest);
        let clear = self.empty | king_bb | rook_bb;

        if !(!clear & rook_ray).is_empty() {
            return false;
        }
        if !((!clear | self.danger) & king_ray).is_empty() {
            return false;
        }
        // The vacating rook may have been the only thing between an enemy
        // slider and the king's destination.
        !self
            .position
            .board()
            .square_attacked(king_dest, self.them, self.occupied ^ rook_bb)
    }

    /// Pawn pushes whose destination lands in `valid_destinations`.
    fn pawn_pushes(&self, moves: &mut MoveList, valid_destinations: Bitboard) {
        let mut pawns = Bitboard::EMPTY;
        for id in self.pawn_mask {
            pawns.set(self.position.piece_list_sq(self.us).get(id));
        }
        let empty = self.empty;
        let valid_empty = empty & valid_destinations;
        let (single, double): (Bitboard, Bitboard) = match self.us {
            Color::White => (
                pawns & Bitboard(valid_empty.0 >> 8),
                pawns
                    & Bitboard(0x0000_0000_0000_FF00)
                    & Bitboard(empty.0 >> 8)
                    & Bitboard(valid_empty.0 >> 16),
            ),
            Color::Black => (
                pawns & Bitboard(valid_empty.0 << 8),
                pawns
                    & Bitboard(0x00FF_0000_0000_0000)
                    & Bitboard(empty.0 << 8)
                    & Bitboard(valid_empty.0 << 16),
            ),
        };

        let push = |from: Square, delta: i8| {
            Square::from_index((from.index() as i8 + delta) as usize)
        };
        let (one, two) = match self.us {
            Color::White => (8i8, 16i8),
            Color::Black => (-8i8, -16i8),
        };
        let promo = promo_zone(self.us);

        for from in single {
            let id = self.position.board().read(from).id();
            let to = push(from, one);
            if !self.pins.allowed(id).has(to) {
                continue;
            }
            if promo.has(to) {
                for flag in PROMO_FLAGS {
                    moves.push(Move::make(from, to, flag));
                }
            } else {
                moves.push(Move::make(from, to, MoveFlags::Normal));
            }
        }
        for from in double {
            let id = self.position.board().read(from).id();
            let to = push(from, two);
            if !self.pins.allowed(id).has(to) {
                continue;
            }
            moves.push(Move::make(from, to, MoveFlags::DoublePush));
        }
    }

    /// Full legality check for an externally supplied move (TT probes,
    /// parsed move text). Never accepts a move `Position::make` cannot
    /// apply soundly.
    #[must_use]
    pub fn is_legal(&self, m: Move) -> bool {
        if m.is_none() {
            return false;
        }
        let from = m.from();
        let to = m.to();
        let src = self.position.board().read(from);
        if src.is_empty() || src.color() != self.us {
            return false;
        }
        let id = src.id();
        let ptype = src.ptype();
        let checker_count = self.checkers.count();

        if m.is_castle() {
            if ptype != PieceType::King {
                return false;
            }
            let aside = m.is_castle_aside();
            let rook_sq = if aside {
                self.position.rook_info().aside(self.us)
            } else {
                self.position.rook_info().hside(self.us)
            };
            return rook_sq.is_valid() && to == rook_sq && self.castle_legal(aside);
        }

        // Only the king moves under double check.
        if checker_count >= 2 && ptype != PieceType::King {
            return false;
        }

        if ptype == PieceType::King {
            if m.is_promotion() || m.is_en_passant() || m.is_double_push() {
                return false;
            }
            if m.is_capture() != self.enemy.has(to) {
                return false;
            }
            if !m.is_capture() && !self.empty.has(to) {
                return false;
            }
            if !self.position.attack_table().read(self.us, to).has(id) {
                return false;
            }
            let without_king = self.occupied ^ Bitboard::from_square(self.king_sq);
            return !self
                .position
                .board()
                .square_attacked(to, self.them, without_king);
        }

        if !self.pins.allowed(id).has(to) {
            return false;
        }

        // The move must address a lone checker: capture it, block it, or
        // take the checking pawn en passant.
        let resolves_check = |dest: Square, ep_victim: Option<Square>| -> bool {
            if checker_count == 0 {
                return true;
            }
            let checker_id = self.checkers.lsb();
            let checker_sq = self.position.piece_list_sq(self.them).get(checker_id);
            if ep_victim == Some(checker_sq) {
                return true;
            }
            if dest == checker_sq {
                return true;
            }
            let checker_pt = self.position.piece_list_ptype(self.them).get(checker_id);
            checker_pt.is_slider()
                && geometry::squares_between(self.king_sq, checker_sq).has(dest)
        };

        if m.is_en_passant() {
            let ep = self.position.enpassant();
            if ptype != PieceType::Pawn || !ep.is_valid() || to != ep {
                return false;
            }
            if !self.position.attack_table().read(self.us, ep).has(id) {
                return false;
            }
            let victim = ep_victim_square(self.us, ep);
            let attackers = self
                .position
                .attack_table()
                .read(self.us, ep)
                .and(self.pawn_mask);
            if !self.ep_clearance_ok(from, victim, attackers.count()) {
                return false;
            }
            return checker_count == 0 || resolves_check(to, Some(victim));
        }

        let promo = promo_zone(self.us);
        if ptype == PieceType::Pawn {
            if promo.has(to) != m.is_promotion() {
                return false;
            }
            if m.is_capture() {
                if !self.enemy.has(to)
                    || !self.position.attack_table().read(self.us, to).has(id)
                {
                    return false;
                }
                return resolves_check(to, None);
            }
            // Pushes
            let one = if self.us == Color::White { 8i8 } else { -8 };
            let delta = to.index() as i8 - from.index() as i8;
            if m.is_double_push() {
                let second_rank = if self.us == Color::White { 1 } else { 6 };
                let mid = Square::from_index((from.index() as i8 + one) as usize);
                if from.rank() != second_rank
                    || delta != one * 2
                    || !self.empty.has(mid)
                    || !self.empty.has(to)
                {
                    return false;
                }
            } else if delta != one || !self.empty.has(to) {
                return false;
            }
            return resolves_check(to, None);
        }

        // Remaining piece kinds move exactly where they attack.
        if m.is_promotion() || m.is_double_push() {
            return false;
        }
        if m.is_capture() != self.enemy.has(to) {
            return false;
        }
        if !m.is_capture() && !self.empty.has(to) {
            return false;
        }
        if !self.position.attack_table().read(self.us, to).has(id) {
            return false;
        }
        resolves_check(to, None)
    }
}

/// The en-passant victim sits on the capturing side's fifth rank.
#[inline]
fn ep_victim_square(us: Color, ep: Square) -> Square {
    Square::from_file_and_rank(ep.file(), if us == Color::White { 4 } else { 3 })
}

#[inline]
fn promo_zone(us: Color) -> Bitboard {
    match us {
        Color::White => Bitboard(0xFF00_0000_0000_0000),
        Color::Black => Bitboard(0x0000_0000_0000_00FF),
    }
}

/// All squares from `a` to `b` along the shared back rank, inclusive.
#[inline]
fn backrank_ray(a: Square, b: Square) -> Bitboard {
    let (lo, hi) = if a.index() <= b.index() { (a, b) } else { (b, a) };
    Bitboard((Bitboard::from_square(hi).0 << 1).wrapping_sub(Bitboard::from_square(lo).0))
}

impl Position {
    /// Generate all legal moves in this position.
    #[must_use]
    pub fn legal_moves(&self) -> MoveList {
        let mut moves = MoveList::new();
        MoveGen::new(self).generate(&mut moves);
        moves
    }

    /// Whether `m` is legal here.
    #[must_use]
    pub fn is_legal(&self, m: Move) -> bool {
        MoveGen::new(self).is_legal(m)
    }
}
