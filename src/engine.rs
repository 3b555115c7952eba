//! The engine: a barrier-synchronised pool of search workers.
//!
//! Workers park on the idle barrier between searches. A cycle starts by
//! publishing the control state under the write lock, then tripping the
//! idle and started barriers; every worker takes a read lock for the
//! duration of its search, so acquiring the write lock doubles as the
//! "all workers idle" handshake.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread::JoinHandle;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use crate::board::{Color, Game};
use crate::output::{EngineOutput, NullOutput};
use crate::search::{History, SearchControl, SearchLimits, Searcher};
use crate::tt::TranspositionTable;

struct ControlState {
    control: SearchControl,
    active_color: Color,
}

struct Shared {
    tt: TranspositionTable,
    stop: AtomicBool,
    state: RwLock<ControlState>,
}

struct Cycle {
    idle: Barrier,
    started: Barrier,
    quit: AtomicBool,
}

struct WorkerSlot {
    game: Mutex<Game>,
}

struct Worker {
    slot: Arc<WorkerSlot>,
    handle: Option<JoinHandle<()>>,
}

struct Pool {
    cycle: Arc<Cycle>,
    workers: Vec<Worker>,
}

type OutputFactory = Arc<dyn Fn() -> Box<dyn EngineOutput> + Send + Sync>;

pub struct Engine {
    shared: Arc<Shared>,
    pool: Option<Pool>,
    thread_count: usize,
    output_factory: OutputFactory,
}

impl Engine {
    /// An engine speaking UCI on stdout.
    #[must_use]
    pub fn new(thread_count: usize, hash_mb: usize) -> Engine {
        Engine::with_output(
            thread_count,
            hash_mb,
            Arc::new(|| Box::new(crate::output::UciOutput) as Box<dyn EngineOutput>),
        )
    }

    /// An engine with a custom output sink factory; the main worker of
    /// each pool generation gets one sink from it.
    #[must_use]
    pub fn with_output(thread_count: usize, hash_mb: usize, output_factory: OutputFactory) -> Engine {
        let shared = Arc::new(Shared {
            tt: TranspositionTable::new(hash_mb),
            stop: AtomicBool::new(false),
            state: RwLock::new(ControlState {
                control: SearchControl::infinite(Instant::now()),
                active_color: Color::White,
            }),
        });
        let mut engine = Engine {
            shared,
            pool: None,
            thread_count: thread_count.max(1),
            output_factory,
        };
        engine.spawn_pool();
        engine
    }

    fn spawn_pool(&mut self) {
        let cycle = Arc::new(Cycle {
            idle: Barrier::new(self.thread_count + 1),
            started: Barrier::new(self.thread_count + 1),
            quit: AtomicBool::new(false),
        });
        let mut workers = Vec::with_capacity(self.thread_count);
        for id in 0..self.thread_count {
            let slot = Arc::new(WorkerSlot {
                game: Mutex::new(Game::startpos()),
            });
            let shared = Arc::clone(&self.shared);
            let cycle_ref = Arc::clone(&cycle);
            let slot_ref = Arc::clone(&slot);
            let mut output: Box<dyn EngineOutput> = if id == 0 {
                (self.output_factory)()
            } else {
                Box::new(NullOutput)
            };
            let handle = std::thread::Builder::new()
                .name(format!("search-{id}"))
                .spawn(move || worker_main(id, &slot_ref, &shared, &cycle_ref, &mut *output))
                .expect("failed to spawn search worker");
            workers.push(Worker {
                slot,
                handle: Some(handle),
            });
        }
        self.pool = Some(Pool { cycle, workers });
    }

    fn pool(&self) -> &Pool {
        self.pool.as_ref().expect("worker pool is running")
    }

    /// Number of worker threads.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Replace the worker pool. Only callable while idle.
    pub fn set_thread_count(&mut self, thread_count: usize) {
        self.quit_all_threads();
        self.thread_count = thread_count.max(1);
        self.shared.stop.store(false, Ordering::SeqCst);
        self.spawn_pool();
    }

    /// Resize the transposition table. Blocks until workers are idle.
    pub fn set_hash_size(&self, mb: usize) {
        let _idle = self.shared.state.write();
        self.shared.tt.resize(mb.max(1));
    }

    /// `ucinewgame`: drop all cached search state.
    pub fn new_game(&self) {
        let _idle = self.shared.state.write();
        self.shared.tt.clear();
    }

    /// Install the game to search in every worker.
    pub fn set_game(&self, game: &Game) {
        let mut state = self.shared.state.write();
        state.active_color = game.position().stm();
        for worker in &self.pool().workers {
            *worker.slot.game.lock() = game.clone();
        }
    }

    /// The acquisition itself is the handshake: it cannot succeed until
    /// every worker has released its search-cycle read lock.
    pub fn is_ready(&self) {
        let _idle = self.shared.state.write();
    }

    /// Begin a search cycle with the given limits.
    pub fn run_search(&self, start_time: Instant, limits: SearchLimits) {
        {
            let mut state = self.shared.state.write();
            self.shared.stop.store(false, Ordering::SeqCst);
            state.control = limits.to_control(start_time, state.active_color);
        }
        let pool = self.pool();
        pool.cycle.idle.wait();
        pool.cycle.started.wait();
    }

    /// Request search termination; the main worker still reports its
    /// bestmove.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
    }

    fn quit_all_threads(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.cycle.quit.store(true, Ordering::SeqCst);
            self.shared.stop.store(true, Ordering::SeqCst);
            pool.cycle.idle.wait();
            for mut worker in pool.workers {
                if let Some(handle) = worker.handle.take() {
                    let _ = handle.join();
                }
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.quit_all_threads();
    }
}

fn worker_main(
    id: usize,
    slot: &WorkerSlot,
    shared: &Shared,
    cycle: &Cycle,
    output: &mut dyn EngineOutput,
) {
    let mut history = History::new();

    loop {
        cycle.idle.wait();
        if cycle.quit.load(Ordering::SeqCst) {
            break;
        }
        let state = shared.state.read();
        cycle.started.wait();

        let control = state.control;
        let mut game = slot.game.lock();
        game.set_hash_waterline();

        let tt = shared.tt.view();
        let mut searcher = Searcher::new(Some(&tt), control, &shared.stop, &mut history);
        let outcome = searcher.run(&game, output);

        // Only the main worker speaks; helper results ride in the TT.
        if id == 0 {
            output.bestmove(outcome.best_move);
        }

        drop(game);
        drop(tt);
        drop(state);
    }
}
