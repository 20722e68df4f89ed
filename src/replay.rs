// Replay of logged decisions
//
// Feeds each snapshot from the JSONL decision log back through the engine and
// measures how the fresh decision differs from the logged one: the move, the
// depth reached, fallbacks, score drift and the opponent reply the search
// expected.

use log::{debug, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::bot::{Bot, Decision};
use crate::config::Config;
use crate::debug_logger::DebugLogEntry;
use crate::score::Score;
use crate::types::Move;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line} is not a decision entry: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("turn {0} is not in the log")]
    MissingTurn(i32),
}

/// Reads every entry of a JSONL decision log; blank lines are skipped
pub fn load_log<P: AsRef<Path>>(path: P) -> Result<Vec<DebugLogEntry>, ReplayError> {
    let path = path.as_ref();
    let io_error = |source: std::io::Error| ReplayError::Io {
        path: path.to_path_buf(),
        source,
    };

    let reader = BufReader::new(File::open(path).map_err(io_error)?);
    let mut entries = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(io_error)?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line).map_err(|source| ReplayError::Parse {
            line: index + 1,
            source,
        })?;
        entries.push(entry);
    }

    debug!("Loaded {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// A logged decision next to the decision the engine makes now
#[derive(Debug, Clone)]
pub struct TurnReplay {
    pub turn: i32,
    pub logged_move: Move,
    pub logged_score: Option<Score>,
    pub logged_depth: u8,
    pub logged_fallback: bool,
    pub logged_reply: Vec<(String, Move)>,
    pub replayed: Decision,
    pub elapsed: Duration,
}

impl TurnReplay {
    pub fn move_matches(&self) -> bool {
        self.logged_move == self.replayed.chosen
    }

    /// Replayed score minus logged score, when both turns were searched
    pub fn score_drift(&self) -> Option<i64> {
        let logged = self.logged_score?;
        let replayed = self.replayed.score?;
        Some(i64::from(replayed) - i64::from(logged))
    }

    /// Whether the expected opponent reply is unchanged. `None` when either
    /// side has no reply to compare, or the moves differ.
    pub fn reply_matches(&self) -> Option<bool> {
        if !self.move_matches()
            || self.logged_reply.is_empty()
            || self.replayed.expected_reply.is_empty()
        {
            return None;
        }
        let (logged, replayed) = (&self.logged_reply, &self.replayed.expected_reply);
        Some(logged.len() == replayed.len() && logged.iter().all(|reply| replayed.contains(reply)))
    }
}

impl fmt::Display for TurnReplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.move_matches() { "same" } else { "CHANGED" };
        write!(
            f,
            "turn {:>4}  {:<5} -> {:<5} {:<7} depth {:>2} -> {:>2}",
            self.turn,
            self.logged_move.as_str(),
            self.replayed.chosen.as_str(),
            verdict,
            self.logged_depth,
            self.replayed.depth
        )?;
        if let Some(drift) = self.score_drift() {
            write!(f, "  drift {:+}", drift)?;
        }
        if self.replayed.used_fallback {
            write!(f, "  fallback")?;
        }
        write!(f, "  {}ms", self.elapsed.as_millis())
    }
}

/// Aggregate view over a set of replayed turns
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReplaySummary {
    pub turns: usize,
    pub move_matches: usize,
    pub logged_fallbacks: usize,
    pub replayed_fallbacks: usize,
    /// Replayed depth to number of turns
    pub depths: BTreeMap<u8, usize>,
    /// Largest absolute score drift among searched turns
    pub max_score_drift: Option<i64>,
    pub replies_compared: usize,
    pub reply_matches: usize,
}

impl ReplaySummary {
    pub fn from_turns(turns: &[TurnReplay]) -> Self {
        let mut summary = ReplaySummary {
            turns: turns.len(),
            ..ReplaySummary::default()
        };

        for turn in turns {
            summary.move_matches += usize::from(turn.move_matches());
            summary.logged_fallbacks += usize::from(turn.logged_fallback);
            summary.replayed_fallbacks += usize::from(turn.replayed.used_fallback);
            *summary.depths.entry(turn.replayed.depth).or_insert(0) += 1;

            if let Some(drift) = turn.score_drift().map(i64::abs) {
                summary.max_score_drift = Some(summary.max_score_drift.map_or(drift, |d| d.max(drift)));
            }
            if let Some(same) = turn.reply_matches() {
                summary.replies_compared += 1;
                summary.reply_matches += usize::from(same);
            }
        }

        summary
    }

    /// Share of turns whose move is unchanged, in percent
    pub fn match_rate(&self) -> f64 {
        if self.turns == 0 {
            return 0.0;
        }
        self.move_matches as f64 * 100.0 / self.turns as f64
    }
}

impl fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "turns {}  same move {} ({:.1}%)",
            self.turns,
            self.move_matches,
            self.match_rate()
        )?;
        writeln!(
            f,
            "fallbacks  logged {}  replayed {}",
            self.logged_fallbacks, self.replayed_fallbacks
        )?;
        let depths: Vec<String> = self
            .depths
            .iter()
            .map(|(depth, count)| format!("{}x{}", depth, count))
            .collect();
        writeln!(f, "depths  {}", depths.join(" "))?;
        if let Some(drift) = self.max_score_drift {
            writeln!(f, "max score drift  {}", drift)?;
        }
        write!(
            f,
            "expected replies  {} of {} unchanged",
            self.reply_matches, self.replies_compared
        )
    }
}

/// Re-runs logged snapshots through a bot built from one configuration
pub struct Replayer {
    bot: Bot,
}

impl Replayer {
    pub fn new(config: Config) -> Self {
        Replayer {
            bot: Bot::new(config),
        }
    }

    /// Replays one entry under the configured time budget. `None` when the
    /// logged snapshot cannot be turned back into a request.
    pub fn replay(&self, entry: &DebugLogEntry) -> Option<TurnReplay> {
        let state = match entry.to_game_state() {
            Ok(state) => state,
            Err(e) => {
                warn!("Skipping turn {}: {}", entry.turn, e);
                return None;
            }
        };

        let started = Instant::now();
        let replayed = self.bot.decide(&state);
        Some(TurnReplay {
            turn: entry.turn,
            logged_move: entry.chosen_move,
            logged_score: entry.score,
            logged_depth: entry.depth,
            logged_fallback: entry.used_fallback,
            logged_reply: entry.expected_reply.clone(),
            replayed,
            elapsed: started.elapsed(),
        })
    }

    /// Replays `turns` in the given order, or the whole log when `turns` is
    /// `None`
    pub fn replay_log(
        &self,
        entries: &[DebugLogEntry],
        turns: Option<&[i32]>,
    ) -> Result<Vec<TurnReplay>, ReplayError> {
        let selected: Vec<&DebugLogEntry> = match turns {
            None => entries.iter().collect(),
            Some(turns) => turns
                .iter()
                .map(|&turn| {
                    entries
                        .iter()
                        .find(|e| e.turn == turn)
                        .ok_or(ReplayError::MissingTurn(turn))
                })
                .collect::<Result<_, _>>()?,
        };

        Ok(selected.into_iter().filter_map(|e| self.replay(e)).collect())
    }
}
