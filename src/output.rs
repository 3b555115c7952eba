//! Engine output sinks.
//!
//! The search streams progress through this trait; the UCI front end
//! plugs in the stdout implementation, tests and helper workers use the
//! null sink.

use std::time::Duration;

use crate::board::Move;
use crate::eval;
use crate::search::Line;

/// One iteration's worth of progress.
pub struct SearchInfo<'a> {
    pub depth: i32,
    pub score: i32,
    pub time: Duration,
    pub nodes: u64,
    pub pv: &'a Line,
}

pub trait EngineOutput: Send {
    fn info(&mut self, info: &SearchInfo);
    fn bestmove(&mut self, m: Move);
}

/// Line-buffered UCI text output on stdout.
pub struct UciOutput;

impl EngineOutput for UciOutput {
    fn info(&mut self, info: &SearchInfo) {
        let millis = info.time.as_millis() as u64;
        let nps = if millis > 0 {
            info.nodes * 1000 / millis
        } else {
            info.nodes
        };
        println!(
            "info depth {} score {} time {} nodes {} nps {} pv {}",
            info.depth,
            format_score(info.score),
            millis,
            info.nodes,
            nps,
            info.pv,
        );
    }

    fn bestmove(&mut self, m: Move) {
        println!("bestmove {m}");
    }
}

/// Discards everything.
pub struct NullOutput;

impl EngineOutput for NullOutput {
    fn info(&mut self, _info: &SearchInfo) {}

    fn bestmove(&mut self, _m: Move) {}
}

/// `cp N` for normal scores, `mate N` (moves, signed) for theoretical ones.
#[must_use]
pub fn format_score(score: i32) -> String {
    if eval::is_win(score) {
        format!("mate {}", (eval::plies_to_mate(score) + 1) / 2)
    } else if eval::is_loss(score) {
        format!("mate -{}", (eval::plies_to_mate(score) + 1) / 2)
    } else {
        format!("cp {score}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(42), "cp 42");
        assert_eq!(format_score(-180), "cp -180");
        assert_eq!(format_score(eval::mating(1)), "mate 1");
        assert_eq!(format_score(eval::mating(5)), "mate 3");
        assert_eq!(format_score(eval::mated(2)), "mate -1");
    }
}
