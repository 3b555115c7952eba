//! Engine thread-pool integration: full search cycles over the worker
//! barriers, stop handling, and the isready handshake.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use briar::board::{Game, Move};
use briar::engine::Engine;
use briar::output::{EngineOutput, SearchInfo};
use briar::search::SearchLimits;

enum Message {
    Info { depth: i32, score: i32 },
    BestMove(Move),
}

struct ChannelOutput {
    sender: mpsc::Sender<Message>,
}

impl EngineOutput for ChannelOutput {
    fn info(&mut self, info: &SearchInfo) {
        let _ = self.sender.send(Message::Info {
            depth: info.depth,
            score: info.score,
        });
    }

    fn bestmove(&mut self, m: Move) {
        let _ = self.sender.send(Message::BestMove(m));
    }
}

fn channel_engine(threads: usize) -> (Engine, mpsc::Receiver<Message>) {
    let (sender, receiver) = mpsc::channel();
    // The factory must be Sync; a raw mpsc sender is not
    let sender = std::sync::Mutex::new(sender);
    let engine = Engine::with_output(
        threads,
        8,
        Arc::new(move || {
            Box::new(ChannelOutput {
                sender: sender.lock().unwrap().clone(),
            }) as Box<dyn EngineOutput>
        }),
    );
    (engine, receiver)
}

fn wait_bestmove(receiver: &mpsc::Receiver<Message>) -> (Vec<(i32, i32)>, Move) {
    let mut infos = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(30);
    loop {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .expect("timed out waiting for bestmove");
        match receiver.recv_timeout(remaining).expect("engine hung") {
            Message::Info { depth, score } => infos.push((depth, score)),
            Message::BestMove(m) => return (infos, m),
        }
    }
}

#[test]
fn test_go_depth_emits_info_then_legal_bestmove() {
    let (engine, receiver) = channel_engine(1);
    let game = Game::startpos();
    engine.set_game(&game);
    engine.run_search(
        Instant::now(),
        SearchLimits {
            depth: Some(3),
            ..Default::default()
        },
    );
    let (infos, best) = wait_bestmove(&receiver);
    assert!(!infos.is_empty(), "expected at least one info line");
    assert!(infos.iter().any(|&(depth, _)| depth == 1));
    assert!(game.position().is_legal(best));
}

#[test]
fn test_isready_blocks_until_search_completes() {
    let (engine, receiver) = channel_engine(1);
    engine.set_game(&Game::startpos());
    engine.run_search(
        Instant::now(),
        SearchLimits {
            depth: Some(4),
            ..Default::default()
        },
    );
    // The handshake may only succeed once the worker released its cycle
    engine.is_ready();
    let (_, best) = wait_bestmove(&receiver);
    assert!(!best.is_none());
}

#[test]
fn test_stop_ends_infinite_search() {
    let (engine, receiver) = channel_engine(1);
    engine.set_game(&Game::startpos());
    engine.run_search(
        Instant::now(),
        SearchLimits {
            infinite: true,
            ..Default::default()
        },
    );
    std::thread::sleep(Duration::from_millis(100));
    engine.stop();
    let (_, best) = wait_bestmove(&receiver);
    assert!(!best.is_none(), "bestmove must still be emitted after stop");
    engine.is_ready();
}

#[test]
fn test_multithreaded_search_completes() {
    let (engine, receiver) = channel_engine(3);
    let game = Game::startpos();
    engine.set_game(&game);
    engine.run_search(
        Instant::now(),
        SearchLimits {
            depth: Some(4),
            ..Default::default()
        },
    );
    let (_, best) = wait_bestmove(&receiver);
    assert!(game.position().is_legal(best));
    engine.is_ready();
}

#[test]
fn test_consecutive_searches_reuse_the_pool() {
    let (engine, receiver) = channel_engine(1);
    let mut game = Game::startpos();
    for _ in 0..3 {
        engine.set_game(&game);
        engine.run_search(
            Instant::now(),
            SearchLimits {
                depth: Some(2),
                ..Default::default()
            },
        );
        let (_, best) = wait_bestmove(&receiver);
        assert!(game.position().is_legal(best));
        game.push(best);
        engine.is_ready();
    }
}

#[test]
fn test_hash_and_thread_options() {
    let (mut engine, receiver) = channel_engine(1);
    engine.set_hash_size(4);
    engine.set_thread_count(2);
    assert_eq!(engine.thread_count(), 2);
    engine.new_game();
    engine.set_game(&Game::startpos());
    engine.run_search(
        Instant::now(),
        SearchLimits {
            depth: Some(2),
            ..Default::default()
        },
    );
    let (_, best) = wait_bestmove(&receiver);
    assert!(!best.is_none());
}
