// Engine-side board model
//
// The API types in `types` mirror the JSON snapshot. The search works on the
// values defined here instead: validated on construction, cheap to clone, and
// never shared mutably between sibling branches.

use log::warn;
use std::collections::{HashSet, VecDeque};
use thiserror::Error;

use crate::types::{Coord, GameState};

/// Health a snake has right after eating
pub const MAX_HEALTH: i32 = 100;

/// Reasons a snapshot cannot be turned into an engine board
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("board dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },

    #[error("snake '{id}' has an empty body")]
    EmptyBody { id: String },

    #[error("snake '{id}' has health {health}, expected 0..=100")]
    HealthOutOfRange { id: String, health: i32 },

    #[error("coordinate ({x}, {y}) lies outside the board")]
    OutOfBounds { x: i32, y: i32 },

    #[error("snake id '{id}' appears more than once")]
    DuplicateSnake { id: String },

    #[error("snake '{id}' is not on the board")]
    MissingSnake { id: String },
}

/// A single living snake: head-first body plus health
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snake {
    id: String,
    body: VecDeque<Coord>,
    health: i32,
}

impl Snake {
    /// Builds a snake, rejecting empty bodies and health outside 0..=100
    pub fn new(
        id: impl Into<String>,
        body: impl IntoIterator<Item = Coord>,
        health: i32,
    ) -> Result<Self, BoardError> {
        let id = id.into();
        let body: VecDeque<Coord> = body.into_iter().collect();
        if body.is_empty() {
            return Err(BoardError::EmptyBody { id });
        }
        if !(0..=MAX_HEALTH).contains(&health) {
            return Err(BoardError::HealthOutOfRange { id, health });
        }
        Ok(Snake { id, body, health })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn body(&self) -> &VecDeque<Coord> {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn head(&self) -> Coord {
        self.body[0]
    }

    pub fn tail(&self) -> Coord {
        self.body[self.body.len() - 1]
    }

    /// True when the tail cell is listed more than once, which means it will
    /// still be occupied after the snake's next move.
    pub fn has_stacked_tail(&self) -> bool {
        let n = self.body.len();
        n >= 2 && self.body[n - 1] == self.body[n - 2]
    }

    pub(crate) fn advance(&mut self, head: Coord, drop_tail: bool) {
        self.body.push_front(head);
        if drop_tail {
            self.body.pop_back();
        }
    }

    pub(crate) fn set_health(&mut self, health: i32) {
        self.health = health.clamp(0, MAX_HEALTH);
    }
}

/// Snapshot of the grid at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: i32,
    height: i32,
    food: HashSet<Coord>,
    hazards: HashSet<Coord>,
    snakes: Vec<Snake>,
    no_shrink: bool,
}

impl Board {
    /// Creates a board, checking that every coordinate is in bounds and every
    /// snake id is unique.
    pub fn new(
        width: i32,
        height: i32,
        food: impl IntoIterator<Item = Coord>,
        hazards: impl IntoIterator<Item = Coord>,
        snakes: Vec<Snake>,
    ) -> Result<Self, BoardError> {
        if width <= 0 || height <= 0 {
            return Err(BoardError::InvalidDimensions { width, height });
        }

        let board = Board {
            width,
            height,
            food: food.into_iter().collect(),
            hazards: hazards.into_iter().collect(),
            snakes: Vec::new(),
            no_shrink: false,
        };

        for c in board.food.iter().chain(board.hazards.iter()) {
            board.check_in_bounds(c)?;
        }

        let mut board = board;
        let mut seen = HashSet::new();
        for snake in snakes {
            if !seen.insert(snake.id.clone()) {
                return Err(BoardError::DuplicateSnake { id: snake.id });
            }
            for c in &snake.body {
                board.check_in_bounds(c)?;
            }
            board.snakes.push(snake);
        }

        Ok(board)
    }

    /// Switches the board to the constrictor variant where tails never move
    pub fn with_no_shrink(mut self, no_shrink: bool) -> Self {
        self.no_shrink = no_shrink;
        self
    }

    /// Converts an API snapshot into an engine board.
    ///
    /// Our own snake must be well formed. A malformed opponent is dropped
    /// with a warning so the turn degrades to a smaller game instead of
    /// failing outright.
    pub fn from_game_state(state: &GameState) -> Result<Self, BoardError> {
        let you = &state.you;
        let mut snakes = Vec::with_capacity(state.board.snakes.len());
        let mut found_you = false;

        for s in &state.board.snakes {
            let parsed = Snake::new(s.id.clone(), s.body.iter().copied(), s.health).and_then(
                |snake| match snake.body.iter().find(|c| {
                    c.x < 0 || c.y < 0 || c.x >= state.board.width || c.y >= state.board.height
                }) {
                    Some(c) => Err(BoardError::OutOfBounds { x: c.x, y: c.y }),
                    None => Ok(snake),
                },
            );
            match parsed {
                Ok(snake) => {
                    found_you |= snake.id == you.id;
                    snakes.push(snake);
                }
                Err(e) if s.id == you.id => return Err(e),
                Err(e) => warn!("Dropping opponent '{}': {}", s.id, e),
            }
        }

        // Some hosts omit "you" from the snake list; add it back.
        if !found_you {
            snakes.insert(0, Snake::new(you.id.clone(), you.body.iter().copied(), you.health)?);
        }

        let board = Board::new(
            state.board.width,
            state.board.height,
            state.board.food.iter().copied(),
            state.board.hazards.iter().copied(),
            snakes,
        )?;
        Ok(board.with_no_shrink(state.game.is_constrictor()))
    }

    fn check_in_bounds(&self, c: &Coord) -> Result<(), BoardError> {
        if self.in_bounds(c) {
            Ok(())
        } else {
            Err(BoardError::OutOfBounds { x: c.x, y: c.y })
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Number of cells on the board
    pub fn area(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    pub fn no_shrink(&self) -> bool {
        self.no_shrink
    }

    pub fn food(&self) -> &HashSet<Coord> {
        &self.food
    }

    pub fn hazards(&self) -> &HashSet<Coord> {
        &self.hazards
    }

    pub fn snakes(&self) -> &[Snake] {
        &self.snakes
    }

    pub fn snake(&self, id: &str) -> Option<&Snake> {
        self.snakes.iter().find(|s| s.id == id)
    }

    /// All snakes other than `me`, in snapshot order
    pub fn opponents<'a>(&'a self, me: &'a str) -> impl Iterator<Item = &'a Snake> + 'a {
        self.snakes.iter().filter(move |s| s.id != me)
    }

    pub fn in_bounds(&self, c: &Coord) -> bool {
        c.x >= 0 && c.y >= 0 && c.x < self.width && c.y < self.height
    }

    pub fn is_food(&self, c: &Coord) -> bool {
        self.food.contains(c)
    }

    pub fn is_hazard(&self, c: &Coord) -> bool {
        self.hazards.contains(c)
    }

    /// True when any snake segment (tails included) sits on `c`
    pub fn is_occupied(&self, c: &Coord) -> bool {
        self.snakes.iter().any(|s| s.body.contains(c))
    }

    /// Manhattan distance from `from` to the closest food, if there is any
    pub fn nearest_food_distance(&self, from: &Coord) -> Option<i32> {
        self.food.iter().map(|f| from.manhattan(f)).min()
    }

    pub(crate) fn snake_index(&self, id: &str) -> Option<usize> {
        self.snakes.iter().position(|s| s.id == id)
    }

    pub(crate) fn snake_mut(&mut self, index: usize) -> &mut Snake {
        &mut self.snakes[index]
    }

    pub(crate) fn remove_food(&mut self, c: &Coord) -> bool {
        self.food.remove(c)
    }

    pub(crate) fn retain_snakes(&mut self, keep: impl Fn(&Snake) -> bool) {
        self.snakes.retain(|s| keep(s));
    }
}
