//! UCI text protocol front end.
//!
//! Reads line-buffered commands from stdin and drives the engine. Parse
//! failures are reported on the channel and the offending command is
//! dropped; nothing protocol-level ever reaches the search.

use std::io::{self, BufRead, Write};
use std::time::Instant;

use crate::board::{format_fen, pretty_print, Game, Position};
use crate::engine::Engine;
use crate::perft;
use crate::search::SearchLimits;
use crate::tt::DEFAULT_HASH_MB;

const NAME: &str = concat!("Briar ", env!("CARGO_PKG_VERSION"));
const AUTHOR: &str = "the Briar authors";

/// Run the command loop until `quit` or end of input.
pub fn run() {
    let mut engine = Engine::new(1, DEFAULT_HASH_MB);
    let mut game = Game::startpos();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let start_time = Instant::now();
        if !dispatch(&mut engine, &mut game, line.trim(), start_time) {
            break;
        }
        let _ = io::stdout().flush();
    }
}

fn protocol_error(cmd: &str, message: impl std::fmt::Display) {
    println!("error ({cmd}): {message}");
}

fn dispatch(engine: &mut Engine, game: &mut Game, line: &str, start_time: Instant) -> bool {
    let mut tokens = line.split_whitespace();
    let Some(cmd) = tokens.next() else {
        return true;
    };

    match cmd {
        "uci" => {
            println!("id name {NAME}");
            println!("id author {AUTHOR}");
            println!("option name Hash type spin default {DEFAULT_HASH_MB} min 1 max 65536");
            println!("option name Threads type spin default 1 min 1 max 256");
            println!("uciok");
        }
        "isready" => {
            engine.is_ready();
            println!("readyok");
        }
        "ucinewgame" => {
            engine.new_game();
            game.reset();
        }
        "setoption" => parse_setoption(engine, tokens),
        "position" => parse_position(game, tokens),
        "moves" | "move" => parse_moves(game, tokens),
        "undo" => {
            let count = parse_count(tokens.next(), 1);
            for _ in 0..count {
                game.pop();
            }
        }
        "go" => {
            let limits = parse_go(tokens);
            engine.set_game(game);
            engine.run_search(start_time, limits);
        }
        "stop" => engine.stop(),
        "perft" => {
            let depth = parse_count(tokens.next(), 1);
            perft::run(game.position(), depth);
        }
        "bench" => bench(),
        "d" => {
            print!("{}", pretty_print(game.position()));
            println!("fen: {}", format_fen(game.position()));
        }
        "getposition" => {
            let record: Vec<String> = game.move_stack().iter().map(|m| m.to_string()).collect();
            println!("moves: {}", record.join(" "));
            println!("fen: {}", format_fen(game.position()));
        }
        "quit" => return false,
        _ => protocol_error(cmd, "unknown command"),
    }
    true
}

fn parse_count(token: Option<&str>, default: usize) -> usize {
    token.and_then(|t| t.parse().ok()).unwrap_or(default)
}

fn parse_setoption<'a>(engine: &mut Engine, mut tokens: impl Iterator<Item = &'a str>) {
    if tokens.next() != Some("name") {
        return protocol_error("setoption", "expected `name`");
    }
    let Some(name) = tokens.next() else {
        return protocol_error("setoption", "missing option name");
    };
    if tokens.next() != Some("value") {
        return protocol_error("setoption", "expected `value`");
    }
    let Some(value) = tokens.next() else {
        return protocol_error("setoption", "missing option value");
    };
    match name {
        "Hash" => match value.parse::<usize>() {
            Ok(mb) if (1..=65536).contains(&mb) => engine.set_hash_size(mb),
            _ => protocol_error("setoption", "Hash out of range"),
        },
        "Threads" => match value.parse::<usize>() {
            Ok(threads) if (1..=256).contains(&threads) => engine.set_thread_count(threads),
            _ => protocol_error("setoption", "Threads out of range"),
        },
        _ => protocol_error("setoption", format!("unknown option `{name}`")),
    }
}

fn parse_position<'a>(game: &mut Game, mut tokens: impl Iterator<Item = &'a str>) {
    match tokens.next() {
        Some("startpos") => game.reset(),
        Some("fen") => {
            let fields: Vec<&str> = (&mut tokens).take(6).collect();
            if fields.len() != 6 {
                return protocol_error("position", "incomplete fen");
            }
            match Position::parse_fields(
                fields[0], fields[1], fields[2], fields[3], fields[4], fields[5],
            ) {
                Ok(position) => game.set_position(position),
                Err(err) => return protocol_error("position", format!("invalid fen: {err}")),
            }
        }
        Some(other) => return protocol_error("position", format!("unrecognised token `{other}`")),
        None => return protocol_error("position", "no position provided"),
    }
    match tokens.next() {
        Some("moves") => parse_moves(game, tokens),
        Some(other) => protocol_error("position", format!("unrecognised token `{other}`")),
        None => {}
    }
}

fn parse_moves<'a>(game: &mut Game, tokens: impl Iterator<Item = &'a str>) {
    for move_str in tokens {
        match game.position().parse_legal_move(move_str) {
            Ok(m) => game.push(m),
            Err(_) => return protocol_error("illegal move", move_str),
        }
    }
}

fn next_number<'a, T: std::str::FromStr>(
    tokens: &mut impl Iterator<Item = &'a str>,
) -> Option<T> {
    tokens.next().and_then(|t| t.parse().ok())
}

fn parse_go<'a>(mut tokens: impl Iterator<Item = &'a str>) -> SearchLimits {
    let mut limits = SearchLimits::default();
    while let Some(token) = tokens.next() {
        match token {
            "wtime" => limits.wtime = next_number(&mut tokens),
            "btime" => limits.btime = next_number(&mut tokens),
            "winc" => limits.winc = next_number(&mut tokens),
            "binc" => limits.binc = next_number(&mut tokens),
            "movestogo" => limits.movestogo = next_number(&mut tokens),
            "movetime" => limits.movetime = next_number(&mut tokens),
            "nodes" => limits.nodes = next_number(&mut tokens),
            "depth" => limits.depth = next_number(&mut tokens),
            "infinite" => limits.infinite = true,
            _ => {}
        }
    }
    limits
}

/// A fixed-position search benchmark: total nodes and speed over a small
/// suite, for quick regression checks.
fn bench() {
    use crate::output::NullOutput;
    use crate::search::{History, SearchControl, Searcher};
    use crate::tt::TranspositionTable;
    use std::sync::atomic::AtomicBool;

    const BENCH_DEPTH: i32 = 7;
    const BENCH_FENS: &[&str] = &[
        Position::STARTPOS_FEN,
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    ];

    let tt = TranspositionTable::new(16);
    let stop = AtomicBool::new(false);
    let start = Instant::now();
    let mut total_nodes = 0u64;

    for fen in BENCH_FENS {
        let game = Game::from_position(Position::parse(fen).expect("bench FEN is valid"));
        tt.clear();
        let view = tt.view();
        let mut history = History::new();
        let control = SearchControl {
            start_time: Instant::now(),
            kind: crate::search::ControlKind::All {
                hard_time: None,
                soft_time: None,
                hard_nodes: None,
                soft_nodes: None,
                depth: Some(BENCH_DEPTH),
            },
        };
        let mut searcher = Searcher::new(Some(&view), control, &stop, &mut history);
        let outcome = searcher.run(&game, &mut NullOutput);
        total_nodes += outcome.nodes;
        println!("{fen}: bestmove {} nodes {}", outcome.best_move, outcome.nodes);
    }

    let elapsed = start.elapsed().as_secs_f64();
    let nps = (total_nodes as f64 / elapsed) as u64;
    println!("{total_nodes} nodes {nps} nps");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_go_limits() {
        let limits = parse_go("wtime 60000 btime 59000 winc 1000 binc 900 movestogo 30".split_whitespace());
        assert_eq!(limits.wtime, Some(60_000));
        assert_eq!(limits.btime, Some(59_000));
        assert_eq!(limits.winc, Some(1_000));
        assert_eq!(limits.binc, Some(900));
        assert_eq!(limits.movestogo, Some(30));
        assert!(!limits.infinite);

        let limits = parse_go("depth 9 nodes 5000".split_whitespace());
        assert_eq!(limits.depth, Some(9));
        assert_eq!(limits.nodes, Some(5_000));

        let limits = parse_go("infinite".split_whitespace());
        assert!(limits.infinite);
    }

    #[test]
    fn test_parse_position_startpos_with_moves() {
        let mut game = Game::startpos();
        parse_position(&mut game, "startpos moves e2e4 e7e5 g1f3".split_whitespace());
        assert_eq!(game.move_stack().len(), 3);
        assert_eq!(
            format_fen(game.position()),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
        );
    }

    #[test]
    fn test_parse_position_fen() {
        let mut game = Game::startpos();
        parse_position(
            &mut game,
            "fen r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1"
                .split_whitespace(),
        );
        assert_eq!(
            format_fen(game.position()),
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1"
        );
    }

    #[test]
    fn test_illegal_move_leaves_game_unchanged() {
        let mut game = Game::startpos();
        let before = format_fen(game.position());
        parse_moves(&mut game, "e2e5".split_whitespace());
        assert_eq!(format_fen(game.position()), before);

        // A legal prefix applies up to the bad token
        parse_moves(&mut game, "e2e4 e7e6 e4d5".split_whitespace());
        assert_eq!(game.move_stack().len(), 2);
    }
}
