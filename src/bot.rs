// Decision selector
//
// Turns one game snapshot into one move. The primary path runs iterative
// deepening until the turn budget is spent and answers with the deepest
// completed iteration. When nothing completed in time, or the snapshot could
// not be turned into a board, a one-ply fallback picks a random locally safe
// move.

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::board::Board;
use crate::config::Config;
use crate::debug_logger::DebugLogger;
use crate::eval::Evaluator;
use crate::score::Score;
use crate::search::{iterative_deepening, SearchEngine};
use crate::simulator::Simulator;
use crate::timing::{CompletedDepth, Deadline, SharedSearchState};
use crate::types::{Coord, GameState, Move};

/// Outcome of one turn's decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub chosen: Move,
    /// Search value of `chosen`; `None` for fallback moves
    pub score: Option<Score>,
    /// Deepest completed depth, 0 for fallback moves
    pub depth: u8,
    pub used_fallback: bool,
    /// Opponent reply the search expected after `chosen`
    pub expected_reply: Vec<(String, Move)>,
    pub nodes: u64,
}

impl Decision {
    fn from_search(result: CompletedDepth) -> Self {
        Decision {
            chosen: result.best_move,
            score: Some(result.score),
            depth: result.depth,
            used_fallback: false,
            expected_reply: result.expected_reply,
            nodes: result.nodes,
        }
    }

    fn fallback(chosen: Move) -> Self {
        Decision {
            chosen,
            score: None,
            depth: 0,
            used_fallback: true,
            expected_reply: Vec::new(),
            nodes: 0,
        }
    }
}

/// Battlesnake Bot with OOP-style API
/// Takes static configuration dependencies and exposes methods corresponding to API endpoints
pub struct Bot {
    config: Config,
    evaluator: Evaluator,
    debug_logger: DebugLogger,
}

impl Bot {
    /// Creates a new Bot instance with the given configuration
    ///
    /// # Arguments
    /// * `config` - Static configuration that does not change during the bot's lifetime
    pub fn new(config: Config) -> Self {
        let evaluator = Evaluator::new(config.scores.clone());
        Bot {
            config,
            evaluator,
            debug_logger: DebugLogger::disabled(),
        }
    }

    /// Attaches a JSONL logger that records every `get_move` decision
    pub fn with_debug_logger(mut self, debug_logger: DebugLogger) -> Self {
        self.debug_logger = debug_logger;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns bot metadata and appearance
    /// Corresponds to GET / endpoint
    pub fn info(&self) -> Value {
        info!("INFO");

        json!({
            "apiversion": "1",
            "author": "minimax-snake",
            "color": "#3E7CB1",
            "head": "default",
            "tail": "default",
        })
    }

    /// Called when a game starts
    /// Corresponds to POST /start endpoint
    pub fn start(&self, state: &GameState) {
        info!(
            "GAME START {} ({}, {}x{}, {} snakes, policy {:?})",
            state.game.id,
            state.game.ruleset_name().unwrap_or("standard"),
            state.board.width,
            state.board.height,
            state.board.snakes.len(),
            self.config.search.policy
        );
    }

    /// Called when a game ends
    /// Corresponds to POST /end endpoint
    pub fn end(&self, state: &GameState) {
        let survived = state.board.snakes.iter().any(|s| s.id == state.you.id);
        info!(
            "GAME OVER {} after {} turns ({})",
            state.game.id,
            state.turn,
            if survived { "survived" } else { "eliminated" }
        );
    }

    /// Generator for one turn, seeded when the configuration asks for it
    fn turn_rng(&self) -> StdRng {
        match self.config.search.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    fn budget(&self) -> Duration {
        Duration::from_millis(self.config.timing.effective_budget_ms())
    }

    /// Synchronous decision: searches on the calling thread until the
    /// budget is spent, then picks the move.
    pub fn decide(&self, state: &GameState) -> Decision {
        self.decide_within(state, &Deadline::after(self.budget()))
    }

    /// Like `decide`, against a caller-owned deadline
    pub fn decide_within(&self, state: &GameState, deadline: &Deadline) -> Decision {
        let mut rng = self.turn_rng();

        let board = match Board::from_game_state(state) {
            Ok(board) => board,
            Err(e) => {
                warn!("Turn {}: unusable snapshot ({}), using fallback", state.turn, e);
                return Decision::fallback(Self::snapshot_fallback(state, &mut rng));
            }
        };

        let shared = SharedSearchState::new();
        let mut engine = SearchEngine::new(&state.you.id, &self.config, &self.evaluator, deadline);
        iterative_deepening(&mut engine, &board, &self.config.timing, &shared, &mut rng);

        Self::conclude(&board, &state.you.id, shared.take_latest(), &mut rng)
    }

    /// Computes and returns the next move using iterative deepening on a
    /// blocking worker
    /// Corresponds to POST /move endpoint
    ///
    /// 1. Spawns the search on tokio's blocking pool
    /// 2. Polls until the budget is spent or the search finishes
    /// 3. Cancels the worker and answers with the deepest completed depth
    pub async fn get_move(&self, state: &GameState) -> Value {
        let decision = self.decide_async(state).await;
        self.debug_logger.log_decision(state, &decision);
        json!({ "move": decision.chosen.as_str() })
    }

    /// Async decision with the search running on a blocking worker
    pub async fn decide_async(&self, state: &GameState) -> Decision {
        let start_time = Instant::now();
        info!("Turn {}: Computing move", state.turn);

        let mut rng = self.turn_rng();
        let board = match Board::from_game_state(state) {
            Ok(board) => board,
            Err(e) => {
                warn!("Turn {}: unusable snapshot ({}), using fallback", state.turn, e);
                return Decision::fallback(Self::snapshot_fallback(state, &mut rng));
            }
        };

        let deadline = Deadline::new(start_time, self.budget());
        let shared = Arc::new(SharedSearchState::new());

        {
            let deadline = deadline.clone();
            let shared = shared.clone();
            let board = board.clone();
            let me = state.you.id.clone();
            let config = self.config.clone();
            let evaluator = self.evaluator.clone();
            let mut worker_rng = self.turn_rng();

            tokio::task::spawn_blocking(move || {
                let mut engine = SearchEngine::new(&me, &config, &evaluator, &deadline);
                iterative_deepening(&mut engine, &board, &config.timing, &shared, &mut worker_rng);
            });
        }

        let polling_interval = Duration::from_millis(self.config.timing.polling_interval_ms);
        loop {
            tokio::time::sleep(polling_interval).await;
            if deadline.is_expired() || shared.is_complete() {
                break;
            }
        }
        deadline.cancel();

        let decision = Self::conclude(&board, &state.you.id, shared.take_latest(), &mut rng);
        info!(
            "Turn {}: Chose {} (score: {:?}, depth: {}, nodes: {}, time: {}ms{})",
            state.turn,
            decision.chosen,
            decision.score,
            decision.depth,
            decision.nodes,
            start_time.elapsed().as_millis(),
            if decision.used_fallback { ", fallback" } else { "" }
        );
        decision
    }

    /// Adopts the search result, or falls back when no depth completed
    fn conclude<R: Rng + ?Sized>(
        board: &Board,
        me: &str,
        result: Option<CompletedDepth>,
        rng: &mut R,
    ) -> Decision {
        match result {
            Some(result) => {
                if !result.expected_reply.is_empty() {
                    info!("Expected reply: {:?}", result.expected_reply);
                }
                Decision::from_search(result)
            }
            None => {
                warn!("No search depth completed in time, using fallback");
                Decision::fallback(Self::fallback_move(board, me, rng))
            }
        }
    }

    /// One-ply fallback: a random move that neither leaves the board nor
    /// hits a body cell that stays occupied; any move when none is safe.
    pub fn fallback_move<R: Rng + ?Sized>(board: &Board, me: &str, rng: &mut R) -> Move {
        let safe: Vec<Move> = Move::all()
            .into_iter()
            .filter(|&mv| Simulator::is_locally_safe(board, me, mv))
            .collect();
        Self::pick(&safe, rng)
    }

    /// Fallback computed straight from the wire snapshot, for snapshots the
    /// engine board rejects.
    fn snapshot_fallback<R: Rng + ?Sized>(state: &GameState, rng: &mut R) -> Move {
        let Some(head) = state.you.body.first().copied().or(state.you.head) else {
            return Self::pick(&[], rng);
        };

        let api = &state.board;
        let occupied = |c: &Coord| {
            api.snakes
                .iter()
                .any(|s| s.body.split_last().is_some_and(|(_, rest)| rest.contains(c)))
        };
        let safe: Vec<Move> = Move::all()
            .into_iter()
            .filter(|mv| {
                let next = mv.apply(&head);
                (0..api.width).contains(&next.x) && (0..api.height).contains(&next.y) && !occupied(&next)
            })
            .collect();
        Self::pick(&safe, rng)
    }

    fn pick<R: Rng + ?Sized>(candidates: &[Move], rng: &mut R) -> Move {
        let all = Move::all();
        let pool: &[Move] = if candidates.is_empty() {
            &all
        } else {
            candidates
        };
        pool[rng.random_range(0..pool.len())]
    }
}
