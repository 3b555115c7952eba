//! Superpiece-ray geometry kernel.
//!
//! Every sight-line query in the engine goes through one primitive: the
//! "superpiece rays" of a square. These are 64 coordinates laid out as
//! eight 8-slot groups, one group per compass direction (N, NE, E, SE, S,
//! SW, W, NW). Within a group, slot 0 is the knight leap belonging to that
//! direction and slots 1-7 are the ray squares at distance 1-7. Reading
//! the mailbox at those 64 coordinates materialises everything a square
//! "sees" in a single gather, at a cost independent of occupancy.
//!
//! The nearest-blocker extraction then runs on the 64-bit slot mask using
//! byte-group arithmetic: with bit 0 and bit 7 of every group forced on,
//! `o ^ (o - 0x03)` per group flips exactly the knight slot plus the run
//! of ray slots up to and including the first occupied one.

use once_cell::sync::Lazy;

use super::types::{Bitboard, Color, PieceType, Square};

/// Slot offsets in expanded `0rrr0fff` coordinate space. Eight groups of
/// eight: slot 0 the knight leap, slots 1-7 the ray at distance 1-7.
const OFFSETS: [u8; 64] = [
    0x1F, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, // north
    0x21, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, // north-east
    0x12, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, // east
    0xF2, 0xF1, 0xE2, 0xD3, 0xC4, 0xB5, 0xA6, 0x97, // south-east
    0xE1, 0xF0, 0xE0, 0xD0, 0xC0, 0xB0, 0xA0, 0x90, // south
    0xDF, 0xEF, 0xDE, 0xCD, 0xBC, 0xAB, 0x9A, 0x89, // south-west
    0xEE, 0xFF, 0xFE, 0xFD, 0xFC, 0xFB, 0xFA, 0xF9, // west
    0x0E, 0x0F, 0x1E, 0x2D, 0x3C, 0x4B, 0x5A, 0x69, // north-west
];

/// Direction group indices into the slot layout.
pub mod dir {
    pub const NORTH: usize = 0;
    pub const NORTH_EAST: usize = 1;
    pub const EAST: usize = 2;
    pub const SOUTH_EAST: usize = 3;
    pub const SOUTH: usize = 4;
    pub const SOUTH_WEST: usize = 5;
    pub const WEST: usize = 6;
    pub const NORTH_WEST: usize = 7;

    /// (file step, rank step) per group.
    pub const STEPS: [(i8, i8); 8] = [
        (0, 1),
        (1, 1),
        (1, 0),
        (1, -1),
        (0, -1),
        (-1, -1),
        (-1, 0),
        (-1, 1),
    ];
}

/// Slot-mask of every knight slot (bit 0 of each group).
pub const KNIGHT_SLOTS: u64 = 0x0101_0101_0101_0101;

/// The superpiece rays of one square: per-slot board coordinates (0x80
/// where the slot falls off the board) and the validity mask.
pub struct SuperpieceRays {
    pub coords: [u8; 64],
    pub valid: u64,
}

static RAYS: Lazy<Vec<SuperpieceRays>> = Lazy::new(|| {
    (0..64usize)
        .map(|idx| {
            let expanded = Square::from_index(idx).expanded();
            let mut coords = [Square::INVALID_RAW; 64];
            let mut valid = 0u64;
            for (slot, &offset) in OFFSETS.iter().enumerate() {
                let uncompressed = expanded.wrapping_add(offset);
                if uncompressed & 0x88 == 0 {
                    coords[slot] = (uncompressed & 0x07) | ((uncompressed & 0x70) >> 1);
                    valid |= 1 << slot;
                }
            }
            SuperpieceRays { coords, valid }
        })
        .collect()
});

/// Look up the superpiece rays emanating from `sq`.
#[inline]
#[must_use]
pub fn superpiece_rays(sq: Square) -> &'static SuperpieceRays {
    &RAYS[sq.index()]
}

/// From a mask of occupied slots, the slots a superpiece at the origin can
/// see: every knight slot, every empty ray slot before the first blocker,
/// and the first blocker itself.
#[inline]
#[must_use]
pub fn visible_slots(occupied_slots: u64, valid: u64) -> u64 {
    let o = occupied_slots | 0x8181_8181_8181_8181;
    let x = o ^ (o.wrapping_sub(0x0303_0303_0303_0303));
    x & valid
}

// Attacker classification bits, one per piece kind that can appear on a ray.
const AK: u8 = 1 << 0; // king
const AWP: u8 = 1 << 1; // white pawn
const ABP: u8 = 1 << 2; // black pawn
const AN: u8 = 1 << 3; // knight
const AB: u8 = 1 << 4; // bishop
const AR: u8 = 1 << 5; // rook
const AQ: u8 = 1 << 6; // queen

/// Mailbox byte high-nibble (colour bit + piece type) to classification bit.
const PTYPE_TO_BITS: [u8; 16] = [
    0, AK, AWP, AN, 0, AB, AR, AQ, // white pieces
    0, AK, ABP, AN, 0, AB, AR, AQ, // black pieces
];

const DIAG: u8 = AB | AQ;
const ORTH: u8 = AR | AQ;
const OADJ: u8 = AR | AQ | AK;
const HORSE: u8 = AN;
const WPDJ: u8 = AB | AQ | AK | AWP;
const BPDJ: u8 = AB | AQ | AK | ABP;

/// For each slot, the set of piece kinds that attack the origin square
/// from there. Pawns attack only from the adjacent forward diagonals: a
/// white pawn sits south of its victim, so white-pawn bits appear on the
/// south-east/south-west adjacent slots.
const ATTACKER_BASE: [u8; 64] = [
    HORSE, OADJ, ORTH, ORTH, ORTH, ORTH, ORTH, ORTH, // north
    HORSE, BPDJ, DIAG, DIAG, DIAG, DIAG, DIAG, DIAG, // north-east
    HORSE, OADJ, ORTH, ORTH, ORTH, ORTH, ORTH, ORTH, // east
    HORSE, WPDJ, DIAG, DIAG, DIAG, DIAG, DIAG, DIAG, // south-east
    HORSE, OADJ, ORTH, ORTH, ORTH, ORTH, ORTH, ORTH, // south
    HORSE, WPDJ, DIAG, DIAG, DIAG, DIAG, DIAG, DIAG, // south-west
    HORSE, OADJ, ORTH, ORTH, ORTH, ORTH, ORTH, ORTH, // west
    HORSE, BPDJ, DIAG, DIAG, DIAG, DIAG, DIAG, DIAG, // north-west
];

/// Classify gathered ray contents: of the `candidates` slots, those whose
/// piece is of a kind that attacks the origin from that slot.
#[inline]
#[must_use]
pub fn attackers_from_rays(places: &[u8; 64], mut candidates: u64) -> u64 {
    let mut out = 0u64;
    while candidates != 0 {
        let slot = candidates.trailing_zeros() as usize;
        candidates &= candidates - 1;
        if PTYPE_TO_BITS[(places[slot] >> 4) as usize] & ATTACKER_BASE[slot] != 0 {
            out |= 1 << slot;
        }
    }
    out
}

/// Per (colour, piece-type-index) mask of slots a piece at the origin
/// attacks towards. The mirror image of `ATTACKER_BASE`: a white pawn at
/// the origin attacks its north-east/north-west adjacent slots.
static ATTACK_MASKS: Lazy<[[u64; 8]; 2]> = Lazy::new(|| {
    let mut masks = [[0u64; 8]; 2];
    for color in 0..2usize {
        for ptype_index in 0..8usize {
            let pt = PieceType::from_index(ptype_index);
            if pt.is_none() {
                continue;
            }
            let mut mask = 0u64;
            for group in 0..8 {
                let (df, dr) = dir::STEPS[group];
                let diagonal = df != 0 && dr != 0;
                for slot_in_group in 0..8usize {
                    let slot = group * 8 + slot_in_group;
                    let attacks = match pt {
                        PieceType::Knight => slot_in_group == 0,
                        PieceType::King => slot_in_group == 1,
                        PieceType::Bishop => diagonal && slot_in_group >= 1,
                        PieceType::Rook => !diagonal && slot_in_group >= 1,
                        PieceType::Queen => slot_in_group >= 1,
                        PieceType::Pawn => {
                            let forward = if color == 0 { dr == 1 } else { dr == -1 };
                            diagonal && forward && slot_in_group == 1
                        }
                        PieceType::None => false,
                    };
                    if attacks {
                        mask |= 1 << slot;
                    }
                }
            }
            masks[color][ptype_index] = mask;
        }
    }
    masks
});

/// Slot-mask of the squares a piece of this colour and type attacks from
/// the origin, before occupancy is taken into account.
#[inline]
#[must_use]
pub fn attack_mask(color: Color, ptype: PieceType) -> u64 {
    ATTACK_MASKS[color.index()][ptype.index()]
}

/// Board squares attacked by a piece of the given kind standing on `sq`,
/// under the given occupancy.
#[must_use]
pub fn piece_attacks(sq: Square, color: Color, ptype: PieceType, occupied: Bitboard) -> Bitboard {
    let rays = superpiece_rays(sq);
    let mut occ_slots = 0u64;
    let mut m = rays.valid;
    while m != 0 {
        let slot = m.trailing_zeros() as usize;
        m &= m - 1;
        if occupied.0 >> rays.coords[slot] & 1 != 0 {
            occ_slots |= 1 << slot;
        }
    }
    let mut slots = visible_slots(occ_slots, rays.valid) & attack_mask(color, ptype);
    let mut bb = Bitboard::EMPTY;
    while slots != 0 {
        let slot = slots.trailing_zeros() as usize;
        slots &= slots - 1;
        bb.0 |= 1 << rays.coords[slot];
    }
    bb
}

/// The squares strictly between two aligned squares; empty if unaligned.
#[must_use]
pub fn squares_between(a: Square, b: Square) -> Bitboard {
    let df = (b.file() as i8 - a.file() as i8).signum();
    let dr = (b.rank() as i8 - a.rank() as i8).signum();
    let file_dist = (b.file() as i8 - a.file() as i8).abs();
    let rank_dist = (b.rank() as i8 - a.rank() as i8).abs();
    if !(file_dist == 0 || rank_dist == 0 || file_dist == rank_dist) {
        return Bitboard::EMPTY;
    }
    let mut bb = Bitboard::EMPTY;
    let mut file = a.file() as i8 + df;
    let mut rank = a.rank() as i8 + dr;
    while (file, rank) != (b.file() as i8, b.rank() as i8) {
        bb.set(Square::from_file_and_rank(file as u8, rank as u8));
        file += df;
        rank += dr;
    }
    bb
}
