//! Score bands shared by the evaluator and the search.
//!
//! Heuristic values always stay strictly inside `(-GAME_END, GAME_END)`.
//! Values at or beyond the bounds mean the game is decided. Decisive values
//! carry the remaining search depth so that later losses and earlier wins
//! rank higher.

/// Search value from the maximizer's point of view
pub type Score = i32;

/// Boundary of the decisive bands
pub const GAME_END: Score = 100_000_000;

/// Width of each decisive band; depths must stay below it
pub const GAME_END_SPAN: Score = 100;

/// Upper bound of any search value
pub const SCORE_MAX: Score = GAME_END + GAME_END_SPAN;

/// Lower bound of any search value
pub const SCORE_MIN: Score = -GAME_END - GAME_END_SPAN;

/// Decisive win reached with `remaining` plies still to search
pub fn win(remaining: u8) -> Score {
    GAME_END + Score::from(remaining).min(GAME_END_SPAN - 1)
}

/// Decisive loss reached with `remaining` plies still to search
pub fn loss(remaining: u8) -> Score {
    -GAME_END - Score::from(remaining).min(GAME_END_SPAN - 1)
}

pub fn is_win(score: Score) -> bool {
    score >= GAME_END
}

pub fn is_loss(score: Score) -> bool {
    score <= -GAME_END
}

pub fn is_decisive(score: Score) -> bool {
    is_win(score) || is_loss(score)
}
