//! Bucketed, fingerprint-tagged transposition table.
//!
//! Buckets are 128 bytes (two cache lines): a 16-byte control vector (14
//! one-byte tags, one reserved byte, one round-robin victim index) and 14
//! entries of 8 bytes. Probes and stores are lock-free: entries are plain
//! relaxed atomics, and a torn or raced write is caught by the 22-bit
//! fingerprint check and behaves as a miss.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::board::Move;
use crate::eval;

pub const DEFAULT_HASH_MB: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Bound {
    None = 0b00,
    Lower = 0b01,
    Exact = 0b10,
    Upper = 0b11,
}

impl Bound {
    #[inline]
    fn from_bits(bits: u64) -> Bound {
        match bits & 3 {
            0b01 => Bound::Lower,
            0b10 => Bound::Exact,
            0b11 => Bound::Upper,
            _ => Bound::None,
        }
    }
}

/// A decoded table entry, with the score already re-based to the probing
/// ply.
#[derive(Clone, Copy, Debug)]
pub struct LookupResult {
    pub depth: i32,
    pub bound: Bound,
    pub score: i32,
    pub mv: Move,
}

impl Default for LookupResult {
    fn default() -> Self {
        LookupResult {
            depth: 0,
            bound: Bound::None,
            score: 0,
            mv: Move::NONE,
        }
    }
}

// Entry layout, LSB to MSB:
//   u22 fragment | u2 bound | u8 depth | u16 move | i16 score
const FRAGMENT_WIDTH: u32 = 22;
const FRAGMENT_MASK: u64 = (1 << FRAGMENT_WIDTH) - 1;
const BOUND_SHIFT: u32 = 22;
const DEPTH_SHIFT: u32 = 24;
const MOVE_SHIFT: u32 = 32;
const SCORE_SHIFT: u32 = 48;

#[inline]
fn encode_entry(fragment: u64, ply: i32, lr: LookupResult) -> u64 {
    // Mate scores are stored relative to the entry so they can be reused
    // at a different ply.
    let tt_score = eval::adjust_plies_to_mate(lr.score, -ply);
    let tt_depth = lr.depth.clamp(0, 255) as u64;
    debug_assert!(fragment & FRAGMENT_MASK == fragment);
    fragment
        | ((lr.bound as u64) << BOUND_SHIFT)
        | (tt_depth << DEPTH_SHIFT)
        | (u64::from(lr.mv.as_u16()) << MOVE_SHIFT)
        | (((tt_score as i64 as u64) & 0xFFFF) << SCORE_SHIFT)
}

#[inline]
fn entry_fragment(raw: u64) -> u64 {
    raw & FRAGMENT_MASK
}

#[inline]
fn decode_entry(raw: u64, ply: i32) -> LookupResult {
    let tt_score = (raw as i64 >> SCORE_SHIFT) as i32;
    LookupResult {
        depth: ((raw >> DEPTH_SHIFT) & 0xFF) as i32,
        bound: Bound::from_bits(raw >> BOUND_SHIFT),
        score: eval::adjust_plies_to_mate(tt_score, ply),
        mv: Move::from_u16((raw >> MOVE_SHIFT) as u16),
    }
}

const ENTRY_COUNT: usize = 14;
const VICTIM_BYTE: usize = 15;

#[repr(C, align(128))]
struct Bucket {
    /// Bytes 0-13: control tags. Byte 14: reserved. Byte 15: round-robin
    /// victim index. Held as two words for SWAR tag matching.
    ctrl: [AtomicU64; 2],
    entries: [AtomicU64; ENTRY_COUNT],
}

impl Bucket {
    fn zeroed() -> Bucket {
        Bucket {
            ctrl: [AtomicU64::new(0), AtomicU64::new(0)],
            entries: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    /// Index of the tag byte equal to `ctrl`, if any.
    fn find_ctrl(&self, ctrl: u8) -> Option<usize> {
        for (word_index, word) in self.ctrl.iter().enumerate() {
            let w = word.load(Ordering::Relaxed);
            let x = w ^ (u64::from(ctrl) * 0x0101_0101_0101_0101);
            let mut zeros =
                x.wrapping_sub(0x0101_0101_0101_0101) & !x & 0x8080_8080_8080_8080;
            while zeros != 0 {
                let byte = zeros.trailing_zeros() as usize / 8;
                zeros &= zeros - 1;
                let index = word_index * 8 + byte;
                if index < ENTRY_COUNT {
                    return Some(index);
                }
            }
        }
        None
    }

    fn ctrl_byte(&self, index: usize) -> u8 {
        let word = self.ctrl[index / 8].load(Ordering::Relaxed);
        (word >> ((index % 8) * 8)) as u8
    }

    fn set_ctrl_byte(&self, index: usize, value: u8) {
        let word = &self.ctrl[index / 8];
        let shift = (index % 8) * 8;
        let mut w = word.load(Ordering::Relaxed);
        w = (w & !(0xFFu64 << shift)) | (u64::from(value) << shift);
        word.store(w, Ordering::Relaxed);
    }
}

/// Split a hash into bucket index, control byte, and fingerprint. Control
/// and fingerprint come from bits of `hash * bucket_count` independent of
/// the index bits.
#[inline]
fn split_hash(bucket_count: usize, hash: u64) -> (usize, u8, u64) {
    let mul = u128::from(hash) * bucket_count as u128;
    let index = (mul >> 64) as usize;
    let low = mul as u64;
    let ctrl = (low >> 56) as u8;
    let fragment = (low >> (56 - FRAGMENT_WIDTH)) & FRAGMENT_MASK;
    (index, ctrl, fragment)
}

struct Buckets {
    buckets: Box<[Bucket]>,
}

impl Buckets {
    fn new(mb: usize) -> Buckets {
        let bucket_count = (mb * 1024 * 1024 / std::mem::size_of::<Bucket>()).max(1);
        let mut buckets = Vec::with_capacity(bucket_count);
        buckets.resize_with(bucket_count, Bucket::zeroed);
        Buckets {
            buckets: buckets.into_boxed_slice(),
        }
    }
}

/// The shared table. Probes and stores go through a read guard and touch
/// only atomics; resizing takes the write lock while the workers are
/// parked.
pub struct TranspositionTable {
    inner: RwLock<Buckets>,
}

impl TranspositionTable {
    #[must_use]
    pub fn new(mb: usize) -> TranspositionTable {
        TranspositionTable {
            inner: RwLock::new(Buckets::new(mb)),
        }
    }

    /// Borrow a probe/store view. Hold it for the duration of a search
    /// cycle.
    #[must_use]
    pub fn view(&self) -> TtView<'_> {
        TtView {
            guard: self.inner.read(),
        }
    }

    pub fn resize(&self, mb: usize) {
        *self.inner.write() = Buckets::new(mb);
    }

    pub fn clear(&self) {
        let guard = self.inner.read();
        for bucket in guard.buckets.iter() {
            bucket.ctrl[0].store(0, Ordering::Relaxed);
            bucket.ctrl[1].store(0, Ordering::Relaxed);
            for entry in &bucket.entries {
                entry.store(0, Ordering::Relaxed);
            }
        }
    }
}

pub struct TtView<'a> {
    guard: parking_lot::RwLockReadGuard<'a, Buckets>,
}

impl TtView<'_> {
    /// Probe at (hash, ply). Returns a `Bound::None` result on miss.
    #[must_use]
    pub fn load(&self, hash: u64, ply: i32) -> LookupResult {
        let buckets = &self.guard.buckets;
        let (index, ctrl, fragment) = split_hash(buckets.len(), hash);
        let bucket = &buckets[index];
        if let Some(entry_index) = bucket.find_ctrl(ctrl) {
            let raw = bucket.entries[entry_index].load(Ordering::Relaxed);
            if entry_fragment(raw) == fragment {
                return decode_entry(raw, ply);
            }
        }
        LookupResult::default()
    }

    /// Store at (hash, ply), overwriting a tag match or evicting the
    /// round-robin victim.
    pub fn store(&self, hash: u64, ply: i32, lr: LookupResult) {
        let buckets = &self.guard.buckets;
        let (index, ctrl, fragment) = split_hash(buckets.len(), hash);
        let bucket = &buckets[index];
        let entry_index = match bucket.find_ctrl(ctrl) {
            Some(i) => i,
            None => {
                let victim = bucket.ctrl_byte(VICTIM_BYTE) as usize % ENTRY_COUNT;
                bucket.set_ctrl_byte(VICTIM_BYTE, ((victim + 1) % ENTRY_COUNT) as u8);
                victim
            }
        };
        bucket.set_ctrl_byte(entry_index, ctrl);
        bucket.entries[entry_index].store(encode_entry(fragment, ply, lr), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{MoveFlags, Square};

    fn mv(from: &str, to: &str) -> Move {
        Move::make(
            from.parse::<Square>().unwrap(),
            to.parse::<Square>().unwrap(),
            MoveFlags::Normal,
        )
    }

    #[test]
    fn test_store_load_round_trip() {
        let tt = TranspositionTable::new(64);
        let view = tt.view();
        let lr = LookupResult {
            depth: 12,
            bound: Bound::Exact,
            score: 137,
            mv: mv("e2", "e4"),
        };
        view.store(0xDEAD_BEEF_0123_4567, 5, lr);
        let out = view.load(0xDEAD_BEEF_0123_4567, 5);
        assert_eq!(out.depth, 12);
        assert_eq!(out.bound, Bound::Exact);
        assert_eq!(out.score, 137);
        assert_eq!(out.mv, lr.mv);
    }

    #[test]
    fn test_miss_returns_none_bound() {
        let tt = TranspositionTable::new(1);
        let view = tt.view();
        let out = view.load(0x1234_5678_9ABC_DEF0, 0);
        assert_eq!(out.bound, Bound::None);
        assert!(out.mv.is_none());
    }

    #[test]
    fn test_mate_score_ply_rebasing() {
        let tt = TranspositionTable::new(8);
        let view = tt.view();
        let lr = LookupResult {
            depth: 9,
            bound: Bound::Exact,
            score: eval::mating(7),
            mv: mv("h7", "h8"),
        };
        // Stored at ply 3, the entry records mate-in-4 from its node
        view.store(42, 3, lr);
        let same_ply = view.load(42, 3);
        assert_eq!(same_ply.score, eval::mating(7));
        // Reached again at ply 5, the same mate is two plies further out
        let deeper = view.load(42, 5);
        assert_eq!(deeper.score, eval::mating(9));
    }

    #[test]
    fn test_negative_score_round_trip() {
        let tt = TranspositionTable::new(8);
        let view = tt.view();
        let lr = LookupResult {
            depth: 3,
            bound: Bound::Upper,
            score: -2500,
            mv: Move::NONE,
        };
        view.store(7, 0, lr);
        assert_eq!(view.load(7, 0).score, -2500);
    }

    #[test]
    fn test_bucket_fills_then_recycles() {
        let tt = TranspositionTable::new(1);
        let view = tt.view();
        // Hammer one hash repeatedly with different depths: same slot
        for depth in 0..100 {
            view.store(
                99,
                0,
                LookupResult {
                    depth,
                    bound: Bound::Lower,
                    score: depth,
                    mv: Move::NONE,
                },
            );
        }
        let out = view.load(99, 0);
        assert_eq!(out.depth, 99);
        assert_eq!(out.score, 99);
    }
}
