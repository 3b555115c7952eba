//! Staged move picker.
//!
//! Emits moves one at a time in the order: TT move, good noisy (SEE at
//! threshold zero), quiets by history score, deferred bad noisy. Each
//! stage is only paid for when reached; a TT-move cutoff never runs the
//! generator at all.

use crate::board::{Move, MoveGen, MoveList, Position, MAX_MOVES};
use crate::see;

use super::history::History;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Stage {
    TtMove,
    Generate,
    GoodNoisy,
    Quiet,
    BadNoisy,
    End,
}

/// Fixed-capacity scored move list picked by incremental selection sort:
/// each pick swaps the best remaining move to the front, so early cutoffs
/// never pay for a full sort.
struct ScoredMoves {
    moves: [Move; MAX_MOVES],
    scores: [i32; MAX_MOVES],
    len: usize,
    picked: usize,
}

impl ScoredMoves {
    fn new() -> ScoredMoves {
        ScoredMoves {
            moves: [Move::NONE; MAX_MOVES],
            scores: [0; MAX_MOVES],
            len: 0,
            picked: 0,
        }
    }

    fn push(&mut self, m: Move, score: i32) {
        self.moves[self.len] = m;
        self.scores[self.len] = score;
        self.len += 1;
    }

    fn pick_next(&mut self) -> Option<Move> {
        if self.picked >= self.len {
            return None;
        }
        let mut best = self.picked;
        for i in self.picked + 1..self.len {
            if self.scores[i] > self.scores[best] {
                best = i;
            }
        }
        self.moves.swap(self.picked, best);
        self.scores.swap(self.picked, best);
        let m = self.moves[self.picked];
        self.picked += 1;
        Some(m)
    }

    fn picked_slice(&self, count: usize) -> &[Move] {
        &self.moves[..count.min(self.len)]
    }
}

pub struct MovePicker<'a> {
    position: &'a Position,
    movegen: MoveGen<'a>,
    tt_move: Move,
    stage: Stage,
    noisy: ScoredMoves,
    quiet: ScoredMoves,
    bad_noisy: MoveList,
    bad_index: usize,
    skip_quiets: bool,
    noisy_only: bool,
    quiet_marker: usize,
}

impl<'a> MovePicker<'a> {
    #[must_use]
    pub fn new(position: &'a Position, tt_move: Move) -> MovePicker<'a> {
        MovePicker {
            position,
            movegen: MoveGen::new(position),
            tt_move,
            stage: Stage::TtMove,
            noisy: ScoredMoves::new(),
            quiet: ScoredMoves::new(),
            bad_noisy: MoveList::new(),
            bad_index: 0,
            skip_quiets: false,
            noisy_only: false,
            quiet_marker: 0,
        }
    }

    /// A picker for quiescence: noisy moves only, unless in check (then
    /// every evasion is emitted).
    #[must_use]
    pub fn new_noisy(position: &'a Position) -> MovePicker<'a> {
        let mut picker = MovePicker::new(position, Move::NONE);
        picker.noisy_only = !picker.movegen.in_check();
        picker
    }

    #[must_use]
    pub fn in_check(&self) -> bool {
        self.movegen.in_check()
    }

    /// Suppress the quiet stage from here on.
    pub fn skip_quiets(&mut self) {
        self.skip_quiets = true;
    }

    /// Record how many quiets have been emitted; `marked_quiets` later
    /// returns all of them except the most recent (the cutoff move).
    pub fn set_marker(&mut self) {
        if self.stage == Stage::Quiet || self.stage == Stage::BadNoisy || self.stage == Stage::End {
            self.quiet_marker = self.quiet.picked;
        }
    }

    /// The quiets tried before the cutoff move.
    #[must_use]
    pub fn marked_quiets(&self) -> &[Move] {
        self.quiet.picked_slice(self.quiet_marker.saturating_sub(1))
    }

    pub fn next(&mut self, history: &History) -> Option<Move> {
        loop {
            match self.stage {
                Stage::TtMove => {
                    self.stage = Stage::Generate;
                    if !self.tt_move.is_none() && self.movegen.is_legal(self.tt_move) {
                        return Some(self.tt_move);
                    }
                }
                Stage::Generate => {
                    self.generate(history);
                    self.stage = Stage::GoodNoisy;
                }
                Stage::GoodNoisy => {
                    while let Some(m) = self.noisy.pick_next() {
                        if m == self.tt_move {
                            continue;
                        }
                        if !see::see(self.position, m, 0) {
                            self.bad_noisy.push(m);
                            continue;
                        }
                        return Some(m);
                    }
                    self.stage = if self.noisy_only {
                        Stage::End
                    } else {
                        Stage::Quiet
                    };
                }
                Stage::Quiet => {
                    if !self.skip_quiets {
                        while let Some(m) = self.quiet.pick_next() {
                            if m == self.tt_move {
                                continue;
                            }
                            return Some(m);
                        }
                    }
                    self.stage = Stage::BadNoisy;
                }
                Stage::BadNoisy => {
                    while self.bad_index < self.bad_noisy.len() {
                        let m = self.bad_noisy[self.bad_index];
                        self.bad_index += 1;
                        if m != self.tt_move {
                            return Some(m);
                        }
                    }
                    self.stage = Stage::End;
                }
                Stage::End => return None,
            }
        }
    }

    fn generate(&mut self, history: &History) {
        let mut moves = MoveList::new();
        if self.noisy_only {
            self.movegen.generate_noisy(&mut moves);
        } else {
            self.movegen.generate(&mut moves);
        }
        for &m in moves.iter() {
            if m.is_capture() || m.is_promotion() {
                self.noisy.push(m, noisy_score(self.position, m));
            } else {
                self.quiet.push(m, history.get(m));
            }
        }
    }
}

/// Most-valuable-victim / least-valuable-attacker with a promotion bonus.
fn noisy_score(position: &Position, m: Move) -> i32 {
    let victim = if m.is_en_passant() {
        crate::board::PieceType::Pawn
    } else {
        position.piece_on(m.to())
    };
    let mut score = see::piece_value(victim) * 16 - see::piece_value(position.piece_on(m.from()));
    if m.is_promotion() {
        score += see::piece_value(m.promo_ptype()) * 16;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;

    #[test]
    fn test_yields_all_legal_moves_once() {
        let position = Position::startpos();
        let history = History::new();
        let mut picker = MovePicker::new(&position, Move::NONE);
        let mut seen = Vec::new();
        while let Some(m) = picker.next(&history) {
            assert!(!seen.contains(&m), "duplicate {m}");
            seen.push(m);
        }
        assert_eq!(seen.len(), position.legal_moves().len());
    }

    #[test]
    fn test_tt_move_comes_first_and_never_repeats() {
        let position = Position::startpos();
        let history = History::new();
        let tt_move = position.parse_legal_move("e2e4").unwrap();
        let mut picker = MovePicker::new(&position, tt_move);
        let first = picker.next(&history).unwrap();
        assert_eq!(first, tt_move);
        let mut count = 1;
        while let Some(m) = picker.next(&history) {
            assert_ne!(m, tt_move);
            count += 1;
        }
        assert_eq!(count, position.legal_moves().len());
    }

    #[test]
    fn test_illegal_tt_move_is_dropped() {
        let position = Position::startpos();
        let history = History::new();
        // e2e5 is not a legal move; picker must not yield it
        let bogus = Move::make(
            "e2".parse().unwrap(),
            "e5".parse().unwrap(),
            crate::board::MoveFlags::Normal,
        );
        let mut picker = MovePicker::new(&position, bogus);
        while let Some(m) = picker.next(&history) {
            assert_ne!(m, bogus);
        }
    }

    #[test]
    fn test_captures_before_quiets() {
        // White can take the d5 pawn or play quiet moves
        let position =
            Position::parse("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2")
                .unwrap();
        let history = History::new();
        let mut picker = MovePicker::new(&position, Move::NONE);
        let first = picker.next(&history).unwrap();
        assert!(first.is_capture());
    }

    #[test]
    fn test_skip_quiets() {
        let position = Position::startpos();
        let history = History::new();
        let mut picker = MovePicker::new(&position, Move::NONE);
        picker.skip_quiets();
        // Startpos has no captures at all
        assert!(picker.next(&history).is_none());
    }

    #[test]
    fn test_noisy_picker_in_quiet_position() {
        let position = Position::startpos();
        let history = History::new();
        let mut picker = MovePicker::new_noisy(&position);
        assert!(picker.next(&history).is_none());
    }

    #[test]
    fn test_marked_quiets_exclude_cutoff_move() {
        let position = Position::startpos();
        let history = History::new();
        let mut picker = MovePicker::new(&position, Move::NONE);
        let mut tried = Vec::new();
        for _ in 0..5 {
            let m = picker.next(&history).unwrap();
            picker.set_marker();
            tried.push(m);
        }
        let marked = picker.marked_quiets();
        assert_eq!(marked, &tried[..4]);
    }
}
