// Adversarial search
//
// Our snake maximizes, the set of opponents minimizes as one joint agent.
// Only the opponents nearest to us branch over every move; the rest play a
// single safe move so a crowded board stays searchable.
// Two minimizer policies are supported: strict minimization with alpha-beta
// pruning and a probability-weighted expectation over opponent replies.
// Every recursive call polls the deadline; a cancelled call returns `None`
// and nothing derived from it is ever published.

use log::{debug, info, warn};
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;

use crate::board::{Board, Snake};
use crate::config::{Config, MinimizerPolicy, TimingConfig};
use crate::eval::Evaluator;
use crate::score::{self, Score, SCORE_MAX, SCORE_MIN};
use crate::simulator::{Rules, Side, Simulator, Step, Terminal};
use crate::timing::{CompletedDepth, Deadline, SharedSearchState};
use crate::types::Move;

/// Value of a maximizing node together with the move that produced it
#[derive(Debug, Clone, Copy)]
struct MaxValue {
    score: Score,
    choice: Move,
    /// Index of the opponent reply chosen below `choice`
    reply: Option<usize>,
}

/// Value of a minimizing node; `choice` indexes the joint opponent move
#[derive(Debug, Clone, Copy)]
struct MinValue {
    score: Score,
    choice: Option<usize>,
}

/// Joint opponent replies considered at a minimizing ply.
///
/// The `limit` opponents whose heads are closest to ours branch over all four
/// moves. Every other opponent plays one fixed move, its first locally safe
/// one. Slots keep snapshot order, which is the order moves resolve in.
struct ReplyPlan<'b> {
    slots: Vec<(&'b str, Option<Move>)>,
    branching: usize,
}

impl<'b> ReplyPlan<'b> {
    fn new(board: &'b Board, me: &str, limit: usize) -> Self {
        let opponents: Vec<&'b Snake> = board.snakes().iter().filter(|s| s.id() != me).collect();

        let mut nearest: Vec<usize> = (0..opponents.len()).collect();
        if let Some(head) = board.snake(me).map(|s| s.head()) {
            // stable sort: equal distances keep snapshot order
            nearest.sort_by_key(|&i| opponents[i].head().manhattan(&head));
        }
        let mut branches = vec![false; opponents.len()];
        for &i in nearest.iter().take(limit) {
            branches[i] = true;
        }

        let slots = opponents
            .iter()
            .copied()
            .zip(&branches)
            .map(|(s, &branching)| {
                let fixed = if branching {
                    None
                } else {
                    Some(Self::fixed_move(board, s.id()))
                };
                (s.id(), fixed)
            })
            .collect();

        ReplyPlan {
            slots,
            branching: limit.min(opponents.len()),
        }
    }

    fn fixed_move(board: &Board, id: &str) -> Move {
        Move::all()
            .into_iter()
            .find(|&mv| Simulator::is_locally_safe(board, id, mv))
            .unwrap_or(Move::Up)
    }

    fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of joint replies, 4^branching
    fn replies(&self) -> usize {
        4usize.pow(self.branching as u32)
    }

    /// Writes joint reply `index` into `out`: one base-4 digit per branching
    /// slot, lowest digit first
    fn joint_move(&self, mut index: usize, out: &mut Vec<(&'b str, Move)>) {
        let all = Move::all();
        out.clear();
        for &(id, fixed) in &self.slots {
            let mv = match fixed {
                Some(mv) => mv,
                None => {
                    let mv = all[index % 4];
                    index /= 4;
                    mv
                }
            };
            out.push((id, mv));
        }
    }
}

/// Game-tree search for one decision-making snake
pub struct SearchEngine<'a> {
    me: &'a str,
    simulator: Simulator,
    evaluator: &'a Evaluator,
    policy: MinimizerPolicy,
    weight_base: f64,
    branching: usize,
    deadline: &'a Deadline,
    nodes: u64,
}

impl<'a> SearchEngine<'a> {
    pub fn new(
        me: &'a str,
        config: &Config,
        evaluator: &'a Evaluator,
        deadline: &'a Deadline,
    ) -> Self {
        SearchEngine {
            me,
            simulator: Simulator::new(Rules::from(&config.game_rules)),
            evaluator,
            policy: config.search.policy,
            weight_base: config.search.opponent_weight_base,
            branching: config.search.branching_opponents.max(1),
            deadline,
            nodes: 0,
        }
    }

    /// Runs one fixed-depth search from `board`.
    ///
    /// Returns `None` when the deadline expired before the tree was fully
    /// explored.
    pub fn search<R: Rng + ?Sized>(
        &mut self,
        board: &Board,
        depth: u8,
        rng: &mut R,
    ) -> Option<CompletedDepth> {
        self.nodes = 0;
        let depth = depth.max(1);
        let root = self.max_node(board, depth, SCORE_MIN, SCORE_MAX, true, rng)?;

        // The reply index refers to the plan built on the board after our move.
        let expected_reply = match root.reply {
            Some(index) => {
                let after = self
                    .simulator
                    .step(board, self.me, &[(self.me, root.choice)], Side::Maximizer);
                let plan = ReplyPlan::new(&after.board, self.me, self.branching);
                let mut moves = Vec::new();
                plan.joint_move(index, &mut moves);
                moves
                    .into_iter()
                    .map(|(id, mv)| (id.to_string(), mv))
                    .collect()
            }
            None => Vec::new(),
        };

        Some(CompletedDepth {
            depth,
            score: root.score,
            best_move: root.choice,
            expected_reply,
            nodes: self.nodes,
        })
    }

    fn max_node<R: Rng + ?Sized>(
        &mut self,
        board: &Board,
        depth: u8,
        mut alpha: Score,
        beta: Score,
        root: bool,
        rng: &mut R,
    ) -> Option<MaxValue> {
        if self.deadline.is_expired() {
            return None;
        }
        self.nodes += 1;

        if board.snake(self.me).is_none() {
            return Some(MaxValue {
                score: score::loss(depth),
                choice: Move::Up,
                reply: None,
            });
        }

        let pruning = self.policy == MinimizerPolicy::AlphaBeta;
        let mut best = SCORE_MIN - 1;
        let mut ties: Vec<(Move, Option<usize>)> = Vec::with_capacity(4);

        for mv in Move::all() {
            if self.deadline.is_expired() {
                return None;
            }

            let step = self
                .simulator
                .step(board, self.me, &[(self.me, mv)], Side::Maximizer);
            // At the root a child equal to the best so far must be exact,
            // otherwise a fail-low bound could pass as a tie.
            let child_alpha = if root { alpha.saturating_sub(1) } else { alpha };
            let (value, reply) =
                self.child_value(step, depth - 1, Side::Minimizer, child_alpha, beta, rng)?;

            if value > best {
                best = value;
                ties.clear();
                ties.push((mv, reply));
            } else if value == best {
                ties.push((mv, reply));
            }

            if score::is_win(best) {
                break;
            }
            if pruning {
                alpha = alpha.max(best);
                if beta <= alpha {
                    break;
                }
            }
        }

        let (choice, reply) = ties[rng.random_range(0..ties.len())];
        Some(MaxValue {
            score: best,
            choice,
            reply,
        })
    }

    fn min_node<R: Rng + ?Sized>(
        &mut self,
        board: &Board,
        depth: u8,
        alpha: Score,
        mut beta: Score,
        rng: &mut R,
    ) -> Option<MinValue> {
        if self.deadline.is_expired() {
            return None;
        }
        self.nodes += 1;

        let plan = ReplyPlan::new(board, self.me, self.branching);
        if plan.is_empty() {
            // Nobody left to reply: the round passes straight to us again.
            let step = Step {
                board: board.clone(),
                terminal: None,
                eliminated: Vec::new(),
            };
            let (value, _) = self.child_value(step, depth - 1, Side::Maximizer, alpha, beta, rng)?;
            return Some(MinValue {
                score: value,
                choice: None,
            });
        }

        let replies = plan.replies();
        let mut moves: Vec<(&str, Move)> = Vec::with_capacity(plan.slots.len());
        let mut values: Vec<(usize, Score)> = Vec::with_capacity(replies);

        for index in 0..replies {
            if self.deadline.is_expired() {
                return None;
            }

            plan.joint_move(index, &mut moves);
            let step = self.simulator.step(board, self.me, &moves, Side::Minimizer);
            let (value, _) = self.child_value(step, depth - 1, Side::Maximizer, alpha, beta, rng)?;
            values.push((index, value));

            match self.policy {
                MinimizerPolicy::AlphaBeta => {
                    beta = beta.min(value);
                    if beta <= alpha || score::is_loss(value) {
                        break;
                    }
                }
                // A reply that beats us is always taken.
                MinimizerPolicy::Weighted if score::is_loss(value) => break,
                MinimizerPolicy::Weighted => {}
            }
        }

        let result = match self.policy {
            MinimizerPolicy::AlphaBeta => Self::strict_min(&values, rng),
            MinimizerPolicy::Weighted => self.weighted_min(&values, rng),
        };

        result.or(Some(MinValue {
            score: score::win(depth),
            choice: None,
        }))
    }

    /// Lowest value, ties broken at random
    fn strict_min<R: Rng + ?Sized>(values: &[(usize, Score)], rng: &mut R) -> Option<MinValue> {
        let lowest = values.iter().map(|&(_, v)| v).min()?;
        let ties: Vec<usize> = values
            .iter()
            .filter(|&&(_, v)| v == lowest)
            .map(|&(index, _)| index)
            .collect();
        Some(MinValue {
            score: lowest,
            choice: Some(ties[rng.random_range(0..ties.len())]),
        })
    }

    /// Probability-weighted minimization over the explored replies.
    ///
    /// A reply that puts us in the loss band is taken outright. Replies that
    /// lose for the opponents are never chosen unless nothing else is left,
    /// in which case the lowest of them stands. The rest are averaged under
    /// `base^-(v - v_min)` and the reply is sampled from the same weights.
    fn weighted_min<R: Rng + ?Sized>(
        &self,
        values: &[(usize, Score)],
        rng: &mut R,
    ) -> Option<MinValue> {
        let pick = |&(index, value): &(usize, Score)| MinValue {
            score: value,
            choice: Some(index),
        };

        if let Some(loss) = values.iter().find(|&&(_, v)| score::is_loss(v)) {
            return Some(pick(loss));
        }

        let open: Vec<(usize, Score)> = values
            .iter()
            .copied()
            .filter(|&(_, v)| !score::is_win(v))
            .collect();
        match open.len() {
            // every reply loses: the opponents delay the inevitable
            0 => values.iter().min_by_key(|&&(_, v)| v).map(pick),
            1 => Some(pick(&open[0])),
            _ => Some(self.expectation(&open, rng)),
        }
    }

    /// Opponent weights `base^-(v - v_min)`; the lowest value weighs 1
    fn reply_weights(&self, values: &[(usize, Score)]) -> Vec<f64> {
        let lowest = values.iter().map(|&(_, v)| v).min().unwrap_or(0);
        values
            .iter()
            .map(|&(_, v)| self.weight_base.powf(-f64::from(v - lowest)))
            .collect()
    }

    fn expectation<R: Rng + ?Sized>(&self, values: &[(usize, Score)], rng: &mut R) -> MinValue {
        let weights = self.reply_weights(values);
        let total: f64 = weights.iter().sum();
        let expectation: f64 = values
            .iter()
            .zip(&weights)
            .map(|(&(_, v), w)| f64::from(v) * w)
            .sum::<f64>()
            / total;

        let choice = match WeightedIndex::new(&weights) {
            Ok(dist) => values[dist.sample(rng)].0,
            Err(_) => values
                .iter()
                .min_by_key(|&&(_, v)| v)
                .map(|&(index, _)| index)
                .unwrap_or(0),
        };

        MinValue {
            score: expectation.round() as Score,
            choice: Some(choice),
        }
    }

    /// Value of the board reached by `step` with `remaining` plies left,
    /// plus the opponent reply chosen below it when `next` minimizes.
    ///
    /// Terminal boards get their sentinel, exhausted depth gets the
    /// evaluator, anything else recurses into `next`.
    fn child_value<R: Rng + ?Sized>(
        &mut self,
        step: Step,
        remaining: u8,
        next: Side,
        alpha: Score,
        beta: Score,
        rng: &mut R,
    ) -> Option<(Score, Option<usize>)> {
        match step.terminal {
            Some(Terminal::Win) => return Some((score::win(remaining), None)),
            Some(Terminal::Loss(_)) => return Some((score::loss(remaining), None)),
            None => {}
        }

        if remaining == 0 {
            return Some((self.evaluate(&step.board), None));
        }

        match next {
            Side::Maximizer => self
                .max_node(&step.board, remaining, alpha, beta, false, rng)
                .map(|max| (max.score, None)),
            Side::Minimizer => self
                .min_node(&step.board, remaining, alpha, beta, rng)
                .map(|min| (min.score, min.choice)),
        }
    }

    /// Heuristic value; unscoreable boards count as lost
    fn evaluate(&self, board: &Board) -> Score {
        match self.evaluator.evaluate(board, self.me) {
            Ok(value) => value,
            Err(e) => {
                warn!("Evaluation failed, scoring branch as a loss: {}", e);
                score::loss(0)
            }
        }
    }
}

/// Iterative deepening driver.
///
/// Searches `board` at `initial_depth`, `initial_depth + depth_increment`, ...
/// and publishes every completed iteration to `shared`. Stops when the
/// deadline expires, when an iteration lands in the loss band, or when the
/// maximum depth is reached.
pub fn iterative_deepening<R: Rng + ?Sized>(
    engine: &mut SearchEngine<'_>,
    board: &Board,
    timing: &TimingConfig,
    shared: &SharedSearchState,
    rng: &mut R,
) {
    let mut depth = timing.initial_depth.max(1);

    loop {
        if engine.deadline.is_expired() {
            info!("Stopping search: deadline reached before depth {}", depth);
            break;
        }
        if depth > timing.max_search_depth {
            info!("Stopping search: reached max depth ({})", timing.max_search_depth);
            break;
        }

        shared.set_current_depth(depth);
        debug!("Starting iteration at depth {}", depth);

        let Some(result) = engine.search(board, depth, rng) else {
            info!("Depth {} cancelled, keeping previous result", depth);
            break;
        };

        info!(
            "Depth {} complete: {} (score: {}, nodes: {}, {}ms)",
            result.depth,
            result.best_move,
            result.score,
            result.nodes,
            engine.deadline.elapsed().as_millis()
        );

        let hopeless = score::is_loss(result.score);
        shared.publish(result);
        if hopeless {
            info!("Stopping search: every line loses at depth {}", depth);
            break;
        }

        depth = match depth.checked_add(timing.depth_increment.max(1)) {
            Some(next) => next,
            None => break,
        };
    }

    shared.mark_complete();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Snake;
    use crate::types::Coord;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn snake(id: &str, health: i32, body: &[(i32, i32)]) -> Snake {
        Snake::new(id, body.iter().map(|&(x, y)| Coord::new(x, y)), health).unwrap()
    }

    fn config(policy: MinimizerPolicy) -> Config {
        let mut config = Config::default_hardcoded();
        config.search.policy = policy;
        config
    }

    fn engine_parts(policy: MinimizerPolicy) -> (Config, Evaluator, Deadline) {
        let config = config(policy);
        let evaluator = Evaluator::new(config.scores.clone());
        (config, evaluator, Deadline::never())
    }

    #[test]
    fn test_joint_move_decoding() {
        let b = Board::new(
            11,
            11,
            [],
            [],
            vec![
                snake("me", 50, &[(5, 5)]),
                snake("a", 50, &[(5, 7)]),
                snake("b", 50, &[(7, 5)]),
            ],
        )
        .unwrap();
        let plan = ReplyPlan::new(&b, "me", 3);
        assert_eq!(plan.replies(), 16);

        let mut moves = Vec::new();
        plan.joint_move(0b10_01, &mut moves);
        assert_eq!(moves, vec![("a", Move::Down), ("b", Move::Left)]);
        plan.joint_move(15, &mut moves);
        assert_eq!(moves, vec![("a", Move::Right), ("b", Move::Right)]);
    }

    #[test]
    fn test_only_nearest_opponents_branch() {
        // "far" sits in a corner where Up and Left are walls, so its fixed
        // move is the first safe one, Down.
        let b = Board::new(
            11,
            11,
            [],
            [],
            vec![
                snake("far", 50, &[(0, 10), (1, 10)]),
                snake("me", 50, &[(5, 5)]),
                snake("near", 50, &[(5, 6)]),
                snake("mid", 50, &[(8, 5)]),
            ],
        )
        .unwrap();
        let plan = ReplyPlan::new(&b, "me", 2);
        assert_eq!(plan.replies(), 16);

        let mut moves = Vec::new();
        for index in 0..plan.replies() {
            plan.joint_move(index, &mut moves);
            // snapshot order, with the far snake pinned
            assert_eq!(moves.len(), 3);
            assert_eq!(moves[0], ("far", Move::Down));
            assert_eq!(moves[1].0, "near");
            assert_eq!(moves[2].0, "mid");
        }
    }

    #[test]
    fn test_crowded_board_stays_searchable() {
        // 40 single-cell opponents fill the bottom rows; a joint reply over
        // all of them would be 4^40.
        let mut snakes = vec![snake("me", 80, &[(5, 8)])];
        for i in 0..40 {
            snakes.push(snake(&format!("opp-{}", i), 80, &[(i % 11, i / 11)]));
        }
        let b = Board::new(11, 11, [], [], snakes).unwrap();

        for policy in [MinimizerPolicy::AlphaBeta, MinimizerPolicy::Weighted] {
            let (config, evaluator, deadline) = engine_parts(policy);
            let mut engine = SearchEngine::new("me", &config, &evaluator, &deadline);
            let mut rng = StdRng::seed_from_u64(4);

            let result = engine.search(&b, 2, &mut rng).unwrap();
            assert_eq!(result.expected_reply.len(), 40, "policy {:?}", policy);
            // the root plus one minimizing node per move
            assert!(result.nodes <= 5);
        }
    }

    #[test]
    fn test_weighted_min_takes_a_losing_reply() {
        let (config, evaluator, deadline) = engine_parts(MinimizerPolicy::Weighted);
        let engine = SearchEngine::new("me", &config, &evaluator, &deadline);
        let mut rng = StdRng::seed_from_u64(1);

        let values = [(0, 50), (1, score::win(3)), (2, score::loss(1)), (3, -20)];
        let min = engine.weighted_min(&values, &mut rng).unwrap();
        assert_eq!(min.score, score::loss(1));
        assert_eq!(min.choice, Some(2));
    }

    #[test]
    fn test_weighted_min_never_picks_a_winning_reply_while_others_remain() {
        let (config, evaluator, deadline) = engine_parts(MinimizerPolicy::Weighted);
        let engine = SearchEngine::new("me", &config, &evaluator, &deadline);
        let mut rng = StdRng::seed_from_u64(2);

        let single = [(0, score::win(1)), (1, 40), (2, score::win(5))];
        let min = engine.weighted_min(&single, &mut rng).unwrap();
        assert_eq!((min.score, min.choice), (40, Some(1)));

        let mixed = [(0, 10), (1, score::win(2)), (2, 30)];
        for _ in 0..50 {
            let min = engine.weighted_min(&mixed, &mut rng).unwrap();
            assert!((10..=30).contains(&min.score));
            assert!(matches!(min.choice, Some(0) | Some(2)));
        }

        // only wins left: the lowest one stands
        let all_wins = [(0, score::win(3)), (1, score::win(1)), (2, score::win(2))];
        let min = engine.weighted_min(&all_wins, &mut rng).unwrap();
        assert_eq!((min.score, min.choice), (score::win(1), Some(1)));
    }

    #[test]
    fn test_weighted_expectation_leans_towards_lower_values() {
        let (config, evaluator, deadline) = engine_parts(MinimizerPolicy::Weighted);
        let engine = SearchEngine::new("me", &config, &evaluator, &deadline);

        let values = [(0, 0), (1, 10), (2, 20)];
        let weights = engine.reply_weights(&values);
        assert_eq!(weights[0], 1.0);
        assert!(weights[0] > weights[1] && weights[1] > weights[2]);

        // base 1.01: weights 1 and 1.01^-100, so the mean sits near 27
        let mut rng = StdRng::seed_from_u64(3);
        let min = engine.weighted_min(&[(0, 0), (1, 100)], &mut rng).unwrap();
        assert_eq!(min.score, 27);
    }

    #[test]
    fn test_weighted_reply_is_sampled_from_the_weights() {
        let (config, evaluator, deadline) = engine_parts(MinimizerPolicy::Weighted);
        let engine = SearchEngine::new("me", &config, &evaluator, &deadline);
        let values = [(4, 0), (7, 100)];

        let weights = engine.reply_weights(&values);
        let dist = WeightedIndex::new(&weights).unwrap();
        let mut reference = StdRng::seed_from_u64(9);
        let mut rng = StdRng::seed_from_u64(9);
        let mut lower = 0;
        for _ in 0..2000 {
            let expected = values[dist.sample(&mut reference)].0;
            let min = engine.weighted_min(&values, &mut rng).unwrap();
            assert_eq!(min.choice, Some(expected));
            if expected == 4 {
                lower += 1;
            }
        }
        // about 73% of the mass sits on the lower value
        assert!(lower > 1200 && lower < 1700, "lower picked {} times", lower);
    }

    #[test]
    fn test_food_seeking_solo_snake() {
        let b = Board::new(
            7,
            7,
            [Coord::new(3, 4)],
            [],
            vec![snake("me", 5, &[(3, 3), (3, 2), (3, 1)])],
        )
        .unwrap();

        for policy in [MinimizerPolicy::AlphaBeta, MinimizerPolicy::Weighted] {
            let config = config(policy);
            let evaluator = Evaluator::new(config.scores.clone());
            let deadline = Deadline::never();
            let mut engine = SearchEngine::new("me", &config, &evaluator, &deadline);
            let mut rng = StdRng::seed_from_u64(7);

            let result = engine.search(&b, 2, &mut rng).unwrap();
            assert_eq!(result.best_move, Move::Up, "policy {:?}", policy);
        }
    }

    #[test]
    fn test_same_seed_same_answer() {
        let b = Board::new(
            11,
            11,
            [Coord::new(0, 0), Coord::new(10, 10), Coord::new(5, 9)],
            [],
            vec![
                snake("me", 70, &[(5, 5), (5, 4), (5, 3)]),
                snake("opp", 70, &[(7, 7), (7, 8), (7, 9)]),
            ],
        )
        .unwrap();

        for policy in [MinimizerPolicy::AlphaBeta, MinimizerPolicy::Weighted] {
            let config = config(policy);
            let evaluator = Evaluator::new(config.scores.clone());
            let deadline = Deadline::never();
            let run = |seed: u64| {
                let mut engine = SearchEngine::new("me", &config, &evaluator, &deadline);
                let mut rng = StdRng::seed_from_u64(seed);
                engine.search(&b, 4, &mut rng).unwrap()
            };
            assert_eq!(run(11), run(11));
        }
    }

    #[test]
    fn test_terminal_loss_is_a_sentinel_not_a_heuristic() {
        // Up, Left and Down all die immediately; only Right survives.
        let b = Board::new(
            3,
            3,
            [],
            [],
            vec![snake("me", 50, &[(0, 2), (0, 1), (0, 0)])],
        )
        .unwrap();
        let config = config(MinimizerPolicy::AlphaBeta);
        let evaluator = Evaluator::new(config.scores.clone());
        let deadline = Deadline::never();
        let mut engine = SearchEngine::new("me", &config, &evaluator, &deadline);

        let step = engine
            .simulator
            .step(&b, "me", &[("me", Move::Up)], Side::Maximizer);
        let mut rng = StdRng::seed_from_u64(1);
        let (value, reply) = engine
            .child_value(step, 1, Side::Minimizer, SCORE_MIN, SCORE_MAX, &mut rng)
            .unwrap();
        assert_eq!(value, score::loss(1));
        assert!(reply.is_none());

        let result = engine.search(&b, 2, &mut rng).unwrap();
        assert_eq!(result.best_move, Move::Right);
        assert!(!score::is_decisive(result.score));
    }

    #[test]
    fn test_equal_head_to_head_is_a_loss() {
        // One-row corridor: our only legal cell is (2, 0), which the
        // equal-length opponent can also reach.
        let me = snake("me", 50, &[(1, 0), (0, 0), (0, 0)]);
        let opp = snake("opp", 50, &[(3, 0), (4, 0), (4, 0)]);
        let b = Board::new(5, 1, [], [], vec![me, opp]).unwrap();

        for policy in [MinimizerPolicy::AlphaBeta, MinimizerPolicy::Weighted] {
            let config = config(policy);
            let evaluator = Evaluator::new(config.scores.clone());
            let deadline = Deadline::never();
            let mut engine = SearchEngine::new("me", &config, &evaluator, &deadline);
            let mut rng = StdRng::seed_from_u64(3);

            let result = engine.search(&b, 2, &mut rng).unwrap();
            assert!(score::is_loss(result.score), "policy {:?}", policy);
            assert!(!score::is_win(result.score));
        }
    }

    #[test]
    fn test_opponent_with_only_losing_replies_is_a_win() {
        // The opponent sits in a dead-end corner and every reply kills it.
        let me = snake("me", 90, &[(2, 2), (2, 3), (2, 4)]);
        let opp = snake("opp", 90, &[(0, 0), (1, 0), (1, 1), (0, 1), (0, 1)]);
        let b = Board::new(5, 5, [], [], vec![me, opp]).unwrap();

        for policy in [MinimizerPolicy::AlphaBeta, MinimizerPolicy::Weighted] {
            let config = config(policy);
            let evaluator = Evaluator::new(config.scores.clone());
            let deadline = Deadline::never();
            let mut engine = SearchEngine::new("me", &config, &evaluator, &deadline);
            let mut rng = StdRng::seed_from_u64(5);

            let result = engine.search(&b, 2, &mut rng).unwrap();
            assert!(score::is_win(result.score), "policy {:?}", policy);
        }
    }

    #[test]
    fn test_cancelled_search_returns_none() {
        let b = Board::new(7, 7, [], [], vec![snake("me", 50, &[(3, 3)])]).unwrap();
        let config = config(MinimizerPolicy::Weighted);
        let evaluator = Evaluator::new(config.scores.clone());
        let deadline = Deadline::never();
        deadline.cancel();
        let mut engine = SearchEngine::new("me", &config, &evaluator, &deadline);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(engine.search(&b, 2, &mut rng).is_none());
    }

    #[test]
    fn test_iterative_deepening_publishes_completed_depths() {
        let b = Board::new(
            7,
            7,
            [Coord::new(3, 5)],
            [],
            vec![snake("me", 50, &[(3, 3), (3, 2)])],
        )
        .unwrap();
        let mut config = config(MinimizerPolicy::AlphaBeta);
        config.timing.max_search_depth = 6;
        let evaluator = Evaluator::new(config.scores.clone());
        let deadline = Deadline::never();
        let mut engine = SearchEngine::new("me", &config, &evaluator, &deadline);
        let shared = SharedSearchState::new();
        let mut rng = StdRng::seed_from_u64(2);

        iterative_deepening(&mut engine, &b, &config.timing, &shared, &mut rng);

        assert!(shared.is_complete());
        let latest = shared.latest().unwrap();
        assert_eq!(latest.depth, 6);
        assert_eq!(latest.best_move, Move::Up);
    }

    #[test]
    fn test_iterative_deepening_with_expired_deadline_publishes_nothing() {
        let b = Board::new(7, 7, [], [], vec![snake("me", 50, &[(3, 3)])]).unwrap();
        let config = config(MinimizerPolicy::Weighted);
        let evaluator = Evaluator::new(config.scores.clone());
        let deadline = Deadline::after(std::time::Duration::ZERO);
        let mut engine = SearchEngine::new("me", &config, &evaluator, &deadline);
        let shared = SharedSearchState::new();
        let mut rng = StdRng::seed_from_u64(2);

        iterative_deepening(&mut engine, &b, &config.timing, &shared, &mut rng);
        assert!(shared.latest().is_none());
        assert!(shared.is_complete());
    }

    #[test]
    fn test_hopeless_position_stops_deepening() {
        // boxed in on a 1x2 board: every move dies
        let b = Board::new(1, 2, [], [], vec![snake("me", 50, &[(0, 0), (0, 1), (0, 1)])])
            .unwrap();
        let config = config(MinimizerPolicy::AlphaBeta);
        let evaluator = Evaluator::new(config.scores.clone());
        let deadline = Deadline::never();
        let mut engine = SearchEngine::new("me", &config, &evaluator, &deadline);
        let shared = SharedSearchState::new();
        let mut rng = StdRng::seed_from_u64(2);

        iterative_deepening(&mut engine, &b, &config.timing, &shared, &mut rng);
        let latest = shared.latest().unwrap();
        assert_eq!(latest.depth, config.timing.initial_depth);
        assert!(score::is_loss(latest.score));
    }
}
