// Heuristic evaluator
//
// Scores a non-terminal board from one snake's perspective. Every snake on
// the board contributes the same terms; ours add, each opponent's subtract.
// The evaluator holds only its weights, so the same board always yields the
// same score.

use std::collections::VecDeque;
use thiserror::Error;

use crate::board::{Board, Snake, MAX_HEALTH};
use crate::config::ScoresConfig;
use crate::score::{Score, GAME_END};
use crate::types::{Coord, Move};

/// Reasons a board cannot be scored
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("perspective snake '{id}' is not on the board")]
    MissingPerspective { id: String },

    #[error("heuristic value {value} falls into a decisive band")]
    OutOfRange { value: i64 },
}

/// Result of a bounded flood fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reach {
    /// Empty cells reached, not counting the start cell
    pub cells: usize,
    /// Distance of the farthest cell reached
    pub depth: u32,
}

/// Breadth-first flood fill from `from` over empty, in-bounds cells.
///
/// Cells further than `horizon` steps away are not explored. Every snake
/// segment counts as a wall.
pub fn flood_fill(board: &Board, from: Coord, horizon: u32) -> Reach {
    let width = board.width() as usize;
    let index = |c: &Coord| c.y as usize * width + c.x as usize;

    let mut blocked = vec![false; board.area()];
    for snake in board.snakes() {
        for c in snake.body() {
            blocked[index(c)] = true;
        }
    }

    let mut reach = Reach::default();
    if !board.in_bounds(&from) {
        return reach;
    }
    blocked[index(&from)] = true;

    let mut queue = VecDeque::from([(from, 0u32)]);
    while let Some((cell, dist)) = queue.pop_front() {
        if dist >= horizon {
            continue;
        }
        for mv in Move::all() {
            let next = mv.apply(&cell);
            if !board.in_bounds(&next) || blocked[index(&next)] {
                continue;
            }
            blocked[index(&next)] = true;
            reach.cells += 1;
            reach.depth = reach.depth.max(dist + 1);
            queue.push_back((next, dist + 1));
        }
    }

    reach
}

/// Additive positional evaluator
#[derive(Debug, Clone)]
pub struct Evaluator {
    weights: ScoresConfig,
}

impl Evaluator {
    pub fn new(weights: ScoresConfig) -> Self {
        Evaluator { weights }
    }

    pub fn weights(&self) -> &ScoresConfig {
        &self.weights
    }

    /// Scores `board` for the snake `me`.
    ///
    /// Fails when `me` is not on the board or when the weights push the
    /// estimate into a decisive band.
    pub fn evaluate(&self, board: &Board, me: &str) -> Result<Score, EvalError> {
        if board.snake(me).is_none() {
            return Err(EvalError::MissingPerspective { id: me.to_string() });
        }

        let mut estimate: i64 = 0;
        for snake in board.snakes() {
            let sign: i64 = if snake.id() == me { 1 } else { -1 };
            estimate += sign * self.snake_terms(board, snake);
        }

        if estimate.abs() >= i64::from(GAME_END) {
            return Err(EvalError::OutOfRange { value: estimate });
        }
        Ok(estimate as Score)
    }

    /// Sum of the terms that favour `snake`
    fn snake_terms(&self, board: &Board, snake: &Snake) -> i64 {
        let w = &self.weights;
        let mut total = -self.food_term(board, snake);
        total += self.length_term(snake);
        total -= self.hazard_term(board, snake);
        total += self.space_term(board, snake);
        if w.aggression_enabled {
            total += self.aggression_term(board, snake);
        }
        total
    }

    /// Distance to the nearest food, weighted; lower is better for its owner
    pub fn food_term(&self, board: &Board, snake: &Snake) -> i64 {
        let dist = board
            .nearest_food_distance(&snake.head())
            .unwrap_or(board.width() + board.height());
        i64::from(dist) * i64::from(self.weights.food_weight)
    }

    /// Length plus a bonus at full health
    pub fn length_term(&self, snake: &Snake) -> i64 {
        let bonus = if snake.health() >= MAX_HEALTH {
            i64::from(self.weights.full_health_bonus)
        } else {
            0
        };
        (snake.len() as i64 + bonus) * i64::from(self.weights.length_weight)
    }

    /// Penalty while the head sits on a hazard
    pub fn hazard_term(&self, board: &Board, snake: &Snake) -> i64 {
        if board.is_hazard(&snake.head()) {
            i64::from(self.weights.hazard_penalty)
        } else {
            0
        }
    }

    /// Room to manoeuvre around the head
    pub fn space_term(&self, board: &Board, snake: &Snake) -> i64 {
        let reach = flood_fill(board, snake.head(), self.weights.flood_fill_horizon);
        reach.cells as i64 * i64::from(self.weights.flood_fill_weight)
    }

    /// Chase nearby heads that are no longer than ours, shy away from longer ones
    pub fn aggression_term(&self, board: &Board, snake: &Snake) -> i64 {
        let w = &self.weights;
        let head = snake.head();
        board
            .snakes()
            .iter()
            .filter(|other| other.id() != snake.id())
            .filter(|other| head.manhattan(&other.head()) <= w.aggression_distance)
            .map(|other| {
                let diff = snake.len() as i64 - other.len() as i64;
                let edge = if diff >= 0 { (diff + 1).min(3) } else { -(-diff).min(3) };
                edge * i64::from(w.aggression_weight)
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn snake(id: &str, health: i32, body: &[(i32, i32)]) -> Snake {
        Snake::new(id, body.iter().map(|&(x, y)| Coord::new(x, y)), health).unwrap()
    }

    fn evaluator() -> Evaluator {
        Evaluator::new(Config::default_hardcoded().scores)
    }

    #[test]
    fn test_flood_fill_open_board() {
        let b = Board::new(3, 3, [], [], vec![snake("me", 50, &[(1, 1)])]).unwrap();
        let reach = flood_fill(&b, Coord::new(1, 1), 10);
        assert_eq!(reach.cells, 8);
        assert_eq!(reach.depth, 2);
    }

    #[test]
    fn test_flood_fill_respects_horizon() {
        let b = Board::new(11, 11, [], [], vec![snake("me", 50, &[(5, 5)])]).unwrap();
        let reach = flood_fill(&b, Coord::new(5, 5), 1);
        assert_eq!(reach.cells, 4);
        assert_eq!(reach.depth, 1);
        assert_eq!(flood_fill(&b, Coord::new(5, 5), 0).cells, 0);
    }

    #[test]
    fn test_flood_fill_stops_at_bodies() {
        // wall of body cells splits the board, head in the left pocket
        let body = [(1, 0), (1, 1), (1, 2), (1, 3)];
        let b = Board::new(4, 4, [], [], vec![snake("wall", 50, &body)]).unwrap();
        let reach = flood_fill(&b, Coord::new(0, 0), 20);
        assert_eq!(reach.cells, 3);
    }

    #[test]
    fn test_flood_fill_bounds_hold_everywhere() {
        let b = Board::new(
            5,
            4,
            [],
            [],
            vec![snake("me", 50, &[(2, 2), (2, 1)]), snake("o", 50, &[(4, 3)])],
        )
        .unwrap();
        for x in -1..6 {
            for y in -1..5 {
                let reach = flood_fill(&b, Coord::new(x, y), 50);
                assert!(reach.cells <= b.area());
            }
        }
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let b = Board::new(
            7,
            7,
            [Coord::new(0, 0), Coord::new(6, 6)],
            [Coord::new(3, 3)],
            vec![
                snake("me", 80, &[(1, 1), (1, 2)]),
                snake("o", 100, &[(5, 5), (5, 4), (5, 3)]),
            ],
        )
        .unwrap();
        let e = evaluator();
        assert_eq!(e.evaluate(&b, "me").unwrap(), e.evaluate(&b, "me").unwrap());
    }

    #[test]
    fn test_evaluate_is_antisymmetric_for_two_snakes() {
        let b = Board::new(
            7,
            7,
            [Coord::new(0, 0)],
            [],
            vec![snake("a", 80, &[(1, 1), (1, 2)]), snake("b", 60, &[(5, 5), (5, 4)])],
        )
        .unwrap();
        let e = evaluator();
        assert_eq!(e.evaluate(&b, "a").unwrap(), -e.evaluate(&b, "b").unwrap());
    }

    #[test]
    fn test_closer_food_scores_higher() {
        let near = Board::new(7, 7, [Coord::new(3, 4)], [], vec![snake("me", 50, &[(3, 3)])])
            .unwrap();
        let far = Board::new(7, 7, [Coord::new(0, 0)], [], vec![snake("me", 50, &[(3, 3)])])
            .unwrap();
        let e = evaluator();
        assert!(e.evaluate(&near, "me").unwrap() > e.evaluate(&far, "me").unwrap());
    }

    #[test]
    fn test_full_health_bonus() {
        let e = evaluator();
        let full = snake("me", 100, &[(3, 3)]);
        let hungry = snake("me", 99, &[(3, 3)]);
        assert_eq!(e.length_term(&full) - e.length_term(&hungry), 25);
    }

    #[test]
    fn test_hazard_costs_the_owner() {
        let on = Board::new(7, 7, [], [Coord::new(3, 3)], vec![snake("me", 50, &[(3, 3)])])
            .unwrap();
        let off = Board::new(7, 7, [], [Coord::new(0, 3)], vec![snake("me", 50, &[(3, 3)])])
            .unwrap();
        let e = evaluator();
        assert_eq!(
            e.evaluate(&off, "me").unwrap() - e.evaluate(&on, "me").unwrap(),
            3
        );
    }

    #[test]
    fn test_aggression_prefers_being_longer() {
        let mut weights = Config::default_hardcoded().scores;
        weights.aggression_enabled = true;
        let e = Evaluator::new(weights);

        let long = snake("me", 50, &[(2, 2), (1, 2), (0, 2)]);
        let short = snake("o", 50, &[(3, 3)]);
        let b = Board::new(7, 7, [], [], vec![long.clone(), short.clone()]).unwrap();
        assert!(e.aggression_term(&b, &long) > 0);
        assert!(e.aggression_term(&b, &short) < 0);
    }

    #[test]
    fn test_aggression_counts_equal_length_as_favorable() {
        let mut weights = Config::default_hardcoded().scores;
        weights.aggression_enabled = true;
        let e = Evaluator::new(weights);

        let me = snake("me", 50, &[(2, 2), (1, 2)]);
        let twin = snake("o", 50, &[(3, 3), (3, 4)]);
        let b = Board::new(7, 7, [], [], vec![me.clone(), twin.clone()]).unwrap();
        assert!(e.aggression_term(&b, &me) > 0);
        assert_eq!(e.aggression_term(&b, &me), e.aggression_term(&b, &twin));

        // one segment short flips the sign
        let shorter = snake("o", 50, &[(3, 3)]);
        let b = Board::new(7, 7, [], [], vec![me.clone(), shorter.clone()]).unwrap();
        assert!(e.aggression_term(&b, &shorter) < 0);
    }

    #[test]
    fn test_missing_perspective_is_an_error() {
        let b = Board::new(5, 5, [], [], vec![snake("other", 50, &[(1, 1)])]).unwrap();
        assert_eq!(
            evaluator().evaluate(&b, "me"),
            Err(EvalError::MissingPerspective { id: "me".to_string() })
        );
    }

    #[test]
    fn test_runaway_weights_are_an_error() {
        let mut weights = Config::default_hardcoded().scores;
        weights.length_weight = GAME_END;
        let e = Evaluator::new(weights);
        let b = Board::new(5, 5, [], [], vec![snake("me", 50, &[(1, 1), (1, 2)])]).unwrap();
        assert!(matches!(e.evaluate(&b, "me"), Err(EvalError::OutOfRange { .. })));
    }
}
