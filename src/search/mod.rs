//! Iterative deepening alpha-beta search.
//!
//! One `Searcher` runs per worker thread, over its own game copy, its own
//! history table, and its own PV lines. The transposition table is the
//! only state shared between workers.

mod control;
mod history;
mod line;
mod move_picker;

pub use control::{ControlKind, SearchControl, SearchLimits, NODE_CHECK_MASK};
pub use history::History;
pub use line::{Line, MAX_PLY};
pub use move_picker::MovePicker;

use std::sync::atomic::{AtomicBool, Ordering};

use crate::board::{Game, Move, Position};
use crate::eval;
use crate::output::{EngineOutput, SearchInfo};
use crate::tt::{Bound, LookupResult, TtView};

pub const MAX_DEPTH: i32 = 127;

/// Window half-width for the first aspiration attempt.
const ASPIRATION_DELTA: i32 = 50;
/// Depth from which aspiration windows kick in.
const ASPIRATION_MIN_DEPTH: i32 = 4;

/// Result of a finished (or aborted) search.
#[derive(Clone, Copy, Debug)]
pub struct SearchOutcome {
    pub best_move: Move,
    pub score: i32,
    pub depth: i32,
    pub nodes: u64,
}

pub struct Searcher<'a> {
    tt: Option<&'a TtView<'a>>,
    history: &'a mut History,
    control: SearchControl,
    stop: &'a AtomicBool,
    hash_stack: Vec<u64>,
    nodes: u64,
    stopped: bool,
}

impl<'a> Searcher<'a> {
    #[must_use]
    pub fn new(
        tt: Option<&'a TtView<'a>>,
        control: SearchControl,
        stop: &'a AtomicBool,
        history: &'a mut History,
    ) -> Searcher<'a> {
        Searcher {
            tt,
            history,
            control,
            stop,
            hash_stack: Vec::new(),
            nodes: 0,
            stopped: false,
        }
    }

    #[must_use]
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Run iterative deepening from the game's current position. Emits
    /// `info` lines through `output`; the caller is responsible for
    /// `bestmove`.
    pub fn run(&mut self, game: &Game, output: &mut dyn EngineOutput) -> SearchOutcome {
        let root = *game.position();
        self.hash_stack = game.hash_stack().to_vec();
        self.nodes = 0;
        self.stopped = false;

        let root_moves = root.legal_moves();
        let mut outcome = SearchOutcome {
            best_move: if root_moves.is_empty() {
                Move::NONE
            } else {
                root_moves[0]
            },
            score: if root_moves.is_empty() {
                if root.in_check() {
                    eval::mated(0)
                } else {
                    0
                }
            } else {
                0
            },
            depth: 0,
            nodes: 0,
        };
        if root_moves.is_empty() {
            return outcome;
        }

        // A position that is already drawn in the game record scores zero
        // regardless of what deeper search would say.
        if game.is_draw() {
            let mut pv = Line::new();
            pv.set(outcome.best_move);
            output.info(&SearchInfo {
                depth: 1,
                score: 0,
                time: self.control.elapsed(),
                nodes: self.nodes,
                pv: &pv,
            });
            outcome.depth = 1;
            return outcome;
        }

        let mut prev_score = 0;
        for depth in 1..=MAX_DEPTH {
            let mut pv = Line::new();
            let score = self.search_root(&root, depth, prev_score, &mut pv);
            if self.stopped {
                // A hard abort invalidates the partial iteration.
                break;
            }
            if let Some(best) = pv.first() {
                outcome.best_move = best;
                outcome.score = score;
                outcome.depth = depth;
            }
            prev_score = score;
            #[cfg(feature = "logging")]
            log::debug!(
                "depth {depth} score {score} nodes {} pv {pv}",
                self.nodes
            );
            output.info(&SearchInfo {
                depth,
                score,
                time: self.control.elapsed(),
                nodes: self.nodes,
                pv: &pv,
            });
            if self.stop.load(Ordering::Relaxed) || self.control.check_soft(self.nodes, depth) {
                break;
            }
        }

        outcome.nodes = self.nodes;
        outcome
    }

    /// One root iteration, with an aspiration window around the previous
    /// score at higher depths.
    fn search_root(&mut self, root: &Position, depth: i32, prev_score: i32, pv: &mut Line) -> i32 {
        if depth < ASPIRATION_MIN_DEPTH {
            return self.alpha_beta(root, depth, -eval::INFINITY, eval::INFINITY, 0, pv);
        }
        let mut delta = ASPIRATION_DELTA;
        let mut alpha = (prev_score - delta).max(-eval::INFINITY);
        let mut beta = (prev_score + delta).min(eval::INFINITY);
        loop {
            let score = self.alpha_beta(root, depth, alpha, beta, 0, pv);
            if self.stopped {
                return score;
            }
            if score <= alpha {
                alpha = (score - delta).max(-eval::INFINITY);
                delta *= 2;
            } else if score >= beta {
                beta = (score + delta).min(eval::INFINITY);
                delta *= 2;
            } else {
                return score;
            }
        }
    }

    #[inline]
    fn bump_node(&mut self) {
        self.nodes += 1;
        if self.nodes & NODE_CHECK_MASK == 0 && self.stop.load(Ordering::Relaxed) {
            self.stopped = true;
        }
        if self.control.check_hard(self.nodes) {
            self.stopped = true;
        }
    }

    /// Does the current position's hash appear anywhere below it on the
    /// stack? Within the search a single recurrence already scores as a
    /// draw; the game-history prefix participates too.
    fn is_repetition(&self, hash: u64) -> bool {
        let top = self.hash_stack.len() - 1;
        self.hash_stack[..top].iter().rev().any(|&h| h == hash)
    }

    fn alpha_beta(
        &mut self,
        position: &Position,
        depth: i32,
        mut alpha: i32,
        beta: i32,
        ply: i32,
        pv: &mut Line,
    ) -> i32 {
        pv.clear();
        if depth <= 0 {
            return self.quiescence(position, alpha, beta, ply);
        }
        self.bump_node();
        if self.stopped {
            return 0;
        }
        if ply as usize >= MAX_PLY - 1 {
            return position.evaluate();
        }

        if ply > 0
            && (self.is_repetition(position.hash())
                || position.halfmove_clock() >= 100
                || position.has_insufficient_material())
        {
            return 0;
        }

        // Transposition probe; sufficient-depth entries cut immediately.
        let mut tt_move = Move::NONE;
        if let Some(tt) = self.tt {
            let entry = tt.load(position.hash(), ply);
            if entry.bound != Bound::None {
                tt_move = entry.mv;
                if ply > 0 && entry.depth >= depth {
                    let cutoff = match entry.bound {
                        Bound::Exact => true,
                        Bound::Lower => entry.score >= beta,
                        Bound::Upper => entry.score <= alpha,
                        Bound::None => false,
                    };
                    if cutoff {
                        if !entry.mv.is_none() {
                            pv.set(entry.mv);
                        }
                        return entry.score;
                    }
                }
            }
        }

        let mut best = eval::NO_MOVES;
        let mut best_move = Move::NONE;
        let mut bound = Bound::Upper;
        let mut move_count = 0u32;
        let mut picker = MovePicker::new(position, tt_move);
        let mut child_pv = Line::new();

        while let Some(m) = picker.next(self.history) {
            picker.set_marker();
            move_count += 1;

            let child = position.make(m);
            self.hash_stack.push(child.hash());
            let score = -self.alpha_beta(&child, depth - 1, -beta, -alpha, ply + 1, &mut child_pv);
            self.hash_stack.pop();
            if self.stopped {
                return 0;
            }

            if score > best {
                best = score;
                best_move = m;
                if score > alpha {
                    alpha = score;
                    bound = Bound::Exact;
                    pv.set_with_child(m, &child_pv);
                }
            }
            if alpha >= beta {
                bound = Bound::Lower;
                if m.is_quiet() {
                    self.history.update_quiet(1, m, depth);
                    for &tried in picker.marked_quiets() {
                        self.history.update_quiet(-1, tried, depth);
                    }
                }
                break;
            }
        }

        if move_count == 0 {
            return if position.in_check() {
                eval::mated(ply)
            } else {
                0
            };
        }

        if let Some(tt) = self.tt {
            tt.store(
                position.hash(),
                ply,
                LookupResult {
                    depth,
                    bound,
                    score: best,
                    mv: best_move,
                },
            );
        }

        best
    }

    fn quiescence(&mut self, position: &Position, mut alpha: i32, beta: i32, ply: i32) -> i32 {
        self.bump_node();
        if self.stopped {
            return 0;
        }
        if ply as usize >= MAX_PLY - 1 {
            return position.evaluate();
        }

        let in_check = position.in_check();
        let mut best = eval::NO_MOVES;
        if !in_check {
            // Stand pat: the side to move may decline every capture.
            let static_eval = position.evaluate();
            if static_eval >= beta {
                return static_eval;
            }
            best = static_eval;
            alpha = alpha.max(static_eval);
        }

        let mut move_count = 0u32;
        let mut picker = MovePicker::new_noisy(position);
        while let Some(m) = picker.next(self.history) {
            move_count += 1;
            let child = position.make(m);
            self.hash_stack.push(child.hash());
            let score = -self.quiescence(&child, -beta, -alpha, ply + 1);
            self.hash_stack.pop();
            if self.stopped {
                return 0;
            }
            if score > best {
                best = score;
                if score > alpha {
                    alpha = score;
                }
            }
            if alpha >= beta {
                break;
            }
        }

        if in_check && move_count == 0 {
            return eval::mated(ply);
        }
        best
    }
}
