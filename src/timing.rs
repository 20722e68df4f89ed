// Time controller primitives
//
// The search polls a `Deadline` at every node and before every sibling move.
// Finished iterations are handed to the caller through `SharedSearchState`,
// a single slot that always holds the deepest completed result.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::score::Score;
use crate::types::Move;

/// Cooperative cancellation point shared between the controller and search
#[derive(Debug, Clone)]
pub struct Deadline {
    start: Instant,
    budget: Duration,
    cancelled: Arc<AtomicBool>,
}

impl Deadline {
    /// Deadline measured from `start`
    pub fn new(start: Instant, budget: Duration) -> Self {
        Deadline {
            start,
            budget,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Deadline measured from now
    pub fn after(budget: Duration) -> Self {
        Self::new(Instant::now(), budget)
    }

    /// Deadline that only expires through `cancel`
    pub fn never() -> Self {
        Self::after(Duration::MAX)
    }

    /// Asks the search to unwind at its next check
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// True once cancelled or once the budget is spent
    pub fn is_expired(&self) -> bool {
        self.is_cancelled() || self.start.elapsed() >= self.budget
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.start.elapsed())
    }
}

/// One fully completed iterative deepening iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedDepth {
    pub depth: u8,
    pub score: Score,
    pub best_move: Move,
    /// Opponent reply the search expects after `best_move`
    pub expected_reply: Vec<(String, Move)>,
    pub nodes: u64,
}

/// Lock-light shared state between the search worker and the controller
#[derive(Debug, Default)]
pub struct SharedSearchState {
    /// Deepest completed iteration so far
    latest: Mutex<Option<CompletedDepth>>,
    /// Flag indicating the worker has stopped deepening
    search_complete: AtomicBool,
    /// Depth currently being searched
    current_depth: AtomicU8,
}

impl SharedSearchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a completed iteration. A shallower result never replaces a
    /// deeper one; among equal depths the newer one wins.
    pub fn publish(&self, result: CompletedDepth) {
        let mut slot = self.latest.lock();
        match slot.as_ref() {
            Some(existing) if existing.depth > result.depth => {}
            _ => *slot = Some(result),
        }
    }

    /// Copy of the deepest completed iteration
    pub fn latest(&self) -> Option<CompletedDepth> {
        self.latest.lock().clone()
    }

    /// Removes and returns the deepest completed iteration
    pub fn take_latest(&self) -> Option<CompletedDepth> {
        self.latest.lock().take()
    }

    pub fn set_current_depth(&self, depth: u8) {
        self.current_depth.store(depth, Ordering::Release);
    }

    pub fn current_depth(&self) -> u8 {
        self.current_depth.load(Ordering::Acquire)
    }

    pub fn mark_complete(&self) {
        self.search_complete.store(true, Ordering::Release);
    }

    pub fn is_complete(&self) -> bool {
        self.search_complete.load(Ordering::Acquire)
    }
}
