//! Perft: exhaustive legal-move enumeration for move generator
//! regression.

use std::time::Instant;

use crate::board::{MoveGen, MoveList, Position};

/// Count leaf nodes of the legal move tree to `depth`.
#[must_use]
pub fn perft(position: &Position, depth: usize) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut moves = MoveList::new();
    MoveGen::new(position).generate(&mut moves);
    if depth == 1 {
        return moves.len() as u64;
    }
    let mut nodes = 0;
    for &m in moves.iter() {
        nodes += perft(&position.make(m), depth - 1);
    }
    nodes
}

/// Run perft with per-root-move counts, printing the split and a summary.
pub fn run(position: &Position, depth: usize) {
    let start = Instant::now();
    let mut total = 0u64;
    if depth == 0 {
        total = 1;
    } else {
        let mut moves = MoveList::new();
        MoveGen::new(position).generate(&mut moves);
        for &m in moves.iter() {
            let nodes = perft(&position.make(m), depth - 1);
            total += nodes;
            println!("{m}: {nodes}");
        }
    }
    let elapsed = start.elapsed();
    let mnps = total as f64 / elapsed.as_secs_f64() / 1_000_000.0;
    println!("total nodes: {total}");
    println!("time: {:.3}s ({mnps:.1} Mnps)", elapsed.as_secs_f64());
}
