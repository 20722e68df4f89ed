// Move simulator
//
// Advances the snakes that are active on one ply and returns a fresh board.
// A search round is a maximizing ply (our snake) followed by a minimizing
// ply (every opponent), so "already moved" below means "moved earlier in
// the current round".

use std::collections::HashSet;

use crate::board::{Board, Snake, MAX_HEALTH};
use crate::config::GameRulesConfig;
use crate::types::{Coord, Move};

/// Which side of the search is acting on this ply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Only the decision-making snake moves
    Maximizer,
    /// Every opponent moves, one after another, inside the same step
    Minimizer,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Maximizer => Side::Minimizer,
            Side::Minimizer => Side::Maximizer,
        }
    }
}

/// Why a snake was removed from the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Elimination {
    Wall,
    Collision,
    HeadToHead,
    Starvation,
}

/// Game-ending outcome from the maximizer's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// Every opponent is gone and we are still alive
    Win,
    /// Our snake was eliminated
    Loss(Elimination),
}

/// Result of one simulation step
#[derive(Debug, Clone)]
pub struct Step {
    pub board: Board,
    pub terminal: Option<Terminal>,
    pub eliminated: Vec<(String, Elimination)>,
}

/// Health rules applied by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
    pub health_on_food: i32,
    pub health_loss_per_turn: i32,
    pub hazard_damage: i32,
}

impl Default for Rules {
    fn default() -> Self {
        Rules {
            health_on_food: MAX_HEALTH,
            health_loss_per_turn: 1,
            hazard_damage: 15,
        }
    }
}

impl From<&GameRulesConfig> for Rules {
    fn from(cfg: &GameRulesConfig) -> Self {
        Rules {
            health_on_food: i32::from(cfg.health_on_food).min(MAX_HEALTH),
            health_loss_per_turn: i32::from(cfg.health_loss_per_turn),
            hazard_damage: i32::from(cfg.hazard_damage),
        }
    }
}

/// Applies moves to boards under a fixed set of rules
#[derive(Debug, Clone, Copy, Default)]
pub struct Simulator {
    rules: Rules,
}

impl Simulator {
    pub fn new(rules: Rules) -> Self {
        Simulator { rules }
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Advances the active snakes of one ply.
    ///
    /// `moves` lists the active snakes in resolution order. Ids that are not
    /// on the board are skipped. Eliminations are checked in priority order:
    /// wall, body collision, head-to-head against snakes that already moved
    /// this round, starvation.
    pub fn step(&self, board: &Board, me: &str, moves: &[(&str, Move)], side: Side) -> Step {
        let mut next = board.clone();
        let opponents_before = board.opponents(me).count();

        let mut moved: HashSet<String> = HashSet::new();
        if side == Side::Minimizer && board.snake(me).is_some() {
            moved.insert(me.to_string());
        }
        let mut eliminated: Vec<(String, Elimination)> = Vec::new();

        for &(id, mv) in moves {
            if eliminated.iter().any(|(dead, _)| dead == id) {
                continue;
            }
            let Some(idx) = next.snake_index(id) else {
                continue;
            };

            let snake = &next.snakes()[idx];
            let target = mv.apply(&snake.head());

            if !next.in_bounds(&target) {
                eliminated.push((id.to_string(), Elimination::Wall));
                continue;
            }

            if Self::is_blocked(&next, &target, &moved, &eliminated) {
                eliminated.push((id.to_string(), Elimination::Collision));
                continue;
            }

            let eats = next.is_food(&target);
            let grows = eats || next.no_shrink();
            let mover_len = snake.len() + usize::from(grows);

            let mut mover_loses = false;
            for other in next.snakes() {
                if other.id() == id
                    || !moved.contains(other.id())
                    || eliminated.iter().any(|(dead, _)| dead == other.id())
                    || other.head() != target
                {
                    continue;
                }
                if mover_len >= other.len() {
                    eliminated.push((other.id().to_string(), Elimination::HeadToHead));
                }
                if mover_len <= other.len() {
                    mover_loses = true;
                }
            }
            if mover_loses {
                eliminated.push((id.to_string(), Elimination::HeadToHead));
                continue;
            }

            let health = if eats {
                self.rules.health_on_food
            } else {
                let hazard = if next.is_hazard(&target) {
                    self.rules.hazard_damage
                } else {
                    0
                };
                snake.health() - self.rules.health_loss_per_turn - hazard
            };
            if health <= 0 {
                eliminated.push((id.to_string(), Elimination::Starvation));
                continue;
            }

            if eats {
                next.remove_food(&target);
            }
            let snake = next.snake_mut(idx);
            snake.advance(target, !grows);
            snake.set_health(health);
            moved.insert(id.to_string());
        }

        if !eliminated.is_empty() {
            next.retain_snakes(|s| !eliminated.iter().any(|(dead, _)| dead == s.id()));
        }

        let terminal = if let Some((_, cause)) = eliminated.iter().find(|(dead, _)| dead == me) {
            Some(Terminal::Loss(*cause))
        } else if opponents_before > 0
            && next.snake(me).is_some()
            && next.opponents(me).next().is_none()
        {
            Some(Terminal::Win)
        } else {
            None
        };

        Step {
            board: next,
            terminal,
            eliminated,
        }
    }

    /// True when moving `id` by `mv` on a fresh turn neither leaves the board
    /// nor runs into a body cell that will still be occupied.
    pub fn is_locally_safe(board: &Board, id: &str, mv: Move) -> bool {
        let Some(snake) = board.snake(id) else {
            return false;
        };
        let target = mv.apply(&snake.head());
        board.in_bounds(&target) && !Self::is_blocked(board, &target, &HashSet::new(), &[])
    }

    /// Whether `target` is covered by a body cell that stays occupied.
    ///
    /// A snake that has not moved yet this round still owns its head (it
    /// becomes the neck) and gives up its tail. A snake that already moved
    /// keeps its tail until the round ends; its head is handled by the
    /// head-to-head rule instead. Snakes eliminated earlier in the step no
    /// longer block anything.
    fn is_blocked(
        board: &Board,
        target: &Coord,
        moved: &HashSet<String>,
        eliminated: &[(String, Elimination)],
    ) -> bool {
        board.snakes().iter().any(|s| {
            if eliminated.iter().any(|(dead, _)| dead == s.id()) {
                return false;
            }
            let has_moved = moved.contains(s.id());
            let tail_stays = has_moved || board.no_shrink() || s.has_stacked_tail();
            Self::blocking_cells(s, has_moved, tail_stays).any(|c| c == target)
        })
    }

    fn blocking_cells(
        snake: &Snake,
        has_moved: bool,
        tail_stays: bool,
    ) -> impl Iterator<Item = &Coord> + '_ {
        let n = snake.len();
        let start = usize::from(has_moved);
        let end = if tail_stays { n } else { n - 1 };
        snake.body().range(start.min(end)..end)
    }
}
