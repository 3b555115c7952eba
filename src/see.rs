//! Static exchange evaluation.
//!
//! Answers "does this move win at least `threshold` centipawns in the
//! capture sequence on its target square", using only the ray-attacker
//! inventory of that square. Hidden sliders stacked behind the current
//! attackers re-enter the exchange as the pieces in front are consumed,
//! which falls out of re-running the nearest-blocker extraction after
//! each capture.

use crate::board::geometry::{self, dir};
use crate::board::{Color, Move, PieceType, Place, Position};

/// Exchange values indexed by the piece-type encoding.
#[inline]
#[must_use]
pub fn piece_value(ptype: PieceType) -> i32 {
    const LUT: [i32; 8] = [0, 10000, 100, 300, 0, 300, 500, 900];
    LUT[ptype.index()]
}

/// Whether the exchange starting with `m` nets at least `threshold`.
#[must_use]
pub fn see(position: &Position, m: Move, threshold: i32) -> bool {
    if m.is_castle() {
        return 0 >= threshold;
    }

    let from = m.from();
    let to = m.to();
    let mut stm = position.stm();

    let captured = if m.is_en_passant() {
        PieceType::Pawn
    } else {
        position.piece_on(to)
    };
    let mut score = piece_value(captured);
    if m.is_promotion() {
        score += piece_value(m.promo_ptype()) - piece_value(PieceType::Pawn);
    }
    score -= threshold;
    if score < 0 {
        return false;
    }

    let first = if m.is_promotion() {
        m.promo_ptype()
    } else {
        position.piece_on(from)
    };
    score -= piece_value(first);
    stm = stm.invert();
    if score >= 0 {
        return true;
    }

    // Build the attacker inventory at the target square, with the moving
    // piece already lifted off the board.
    let rays = geometry::superpiece_rays(to);
    let mut places = [0u8; 64];
    let mut occupied = 0u64;
    let mut valid = rays.valid;
    while valid != 0 {
        let slot = valid.trailing_zeros() as usize;
        valid &= valid - 1;
        let coord = rays.coords[slot];
        if coord == from.raw() {
            continue;
        }
        let place = position
            .board()
            .read(crate::board::Square::from_index(coord as usize));
        if !place.is_empty() {
            places[slot] = place.0;
            occupied |= 1 << slot;
        }
    }
    if m.is_en_passant() {
        // The victim pawn sits one step behind the target square.
        let victim_slot = match position.stm() {
            Color::White => dir::SOUTH * 8 + 1,
            Color::Black => dir::NORTH * 8 + 1,
        };
        occupied &= !(1u64 << victim_slot);
    }

    let attackers = geometry::attackers_from_rays(&places, occupied);
    let mut black_slots = 0u64;
    let mut a = attackers;
    while a != 0 {
        let slot = a.trailing_zeros() as usize;
        a &= a - 1;
        if places[slot] & 0x80 != 0 {
            black_slots |= 1 << slot;
        }
    }

    let side_slots = |side: Color| match side {
        Color::White => !black_slots,
        Color::Black => black_slots,
    };
    let visible_attackers = |occupied: u64, side: Color| {
        geometry::visible_slots(occupied, rays.valid) & occupied & attackers & side_slots(side)
    };

    loop {
        let current = visible_attackers(occupied, stm);
        if current == 0 {
            break;
        }
        // Spend the cheapest attacker available.
        let mut best_slot = 64;
        let mut best_value = i32::MAX;
        let mut c = current;
        while c != 0 {
            let slot = c.trailing_zeros() as usize;
            c &= c - 1;
            let v = piece_value(Place(places[slot]).ptype());
            if v < best_value {
                best_value = v;
                best_slot = slot;
            }
        }
        let ptype = Place(places[best_slot]).ptype();
        occupied &= !(1u64 << best_slot);

        score = -score - 1 - best_value;
        stm = stm.invert();

        if ptype == PieceType::King {
            // A king cannot recapture into remaining attackers; if any
            // exist, the capture was illegal and the previous side stands.
            if visible_attackers(occupied, stm) != 0 {
                stm = stm.invert();
            }
            break;
        }

        if score >= 0 {
            break;
        }
    }

    stm != position.stm()
}
