// Debug logging module for asynchronous decision logging
//
// Writes are fire-and-forget so the request/response cycle never waits on
// disk. Each decision becomes one JSONL line holding the snapshot that was
// searched, which is exactly what the replay engine needs to re-run it.

use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::bot::Decision;
use crate::score::Score;
use crate::types::{Board, Game, GameState, Move};

/// One logged decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugLogEntry {
    pub turn: i32,
    pub game: Game,
    /// Id of the snake that made the decision
    pub you_id: String,
    pub chosen_move: Move,
    #[serde(default)]
    pub score: Option<Score>,
    #[serde(default)]
    pub depth: u8,
    #[serde(default)]
    pub used_fallback: bool,
    /// Opponent moves the search expected in answer to `chosen_move`
    #[serde(default)]
    pub expected_reply: Vec<(String, Move)>,
    pub board: Board,
    pub timestamp: String,
}

impl DebugLogEntry {
    pub fn new(state: &GameState, decision: &Decision) -> Self {
        DebugLogEntry {
            turn: state.turn,
            game: state.game.clone(),
            you_id: state.you.id.clone(),
            chosen_move: decision.chosen,
            score: decision.score,
            depth: decision.depth,
            used_fallback: decision.used_fallback,
            expected_reply: decision.expected_reply.clone(),
            board: state.board.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Rebuilds the request the decision was made for
    pub fn to_game_state(&self) -> Result<GameState, String> {
        let you = self
            .board
            .snakes
            .iter()
            .find(|s| s.id == self.you_id)
            .cloned()
            .ok_or_else(|| format!("Snake '{}' not found on turn {}", self.you_id, self.turn))?;

        Ok(GameState {
            game: self.game.clone(),
            turn: self.turn,
            board: self.board.clone(),
            you,
        })
    }
}

/// Shared debug logger state
/// Uses Arc<Mutex<File>> to allow concurrent async writes from multiple tasks
#[derive(Clone)]
pub struct DebugLogger {
    file: Arc<Mutex<Option<File>>>,
    enabled: bool,
}

impl DebugLogger {
    /// Creates a new debug logger
    /// If enabled is true, initializes the log file (truncating if it exists)
    pub async fn new(enabled: bool, log_file_path: &str) -> Self {
        if !enabled {
            return Self::disabled();
        }

        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)
            .await
        {
            Ok(file) => {
                log::info!("Debug logging enabled: {}", log_file_path);
                DebugLogger {
                    file: Arc::new(Mutex::new(Some(file))),
                    enabled: true,
                }
            }
            Err(e) => {
                error!("Failed to create debug log file '{}': {}", log_file_path, e);
                Self::disabled()
            }
        }
    }

    /// Creates a disabled debug logger (no-op)
    pub fn disabled() -> Self {
        DebugLogger {
            file: Arc::new(Mutex::new(None)),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Logs a decision without waiting for the write
    pub fn log_decision(&self, state: &GameState, decision: &Decision) {
        if !self.enabled {
            return;
        }

        let file_handle = self.file.clone();
        let entry = DebugLogEntry::new(state, decision);

        tokio::spawn(async move {
            Self::write_entry(file_handle, entry).await;
        });
    }

    /// Appends one entry as a JSON line and flushes it
    pub(crate) async fn write_entry(file_handle: Arc<Mutex<Option<File>>>, entry: DebugLogEntry) {
        let mut file_guard = file_handle.lock().await;

        let Some(file) = file_guard.as_mut() else {
            return;
        };

        match serde_json::to_string(&entry) {
            Ok(json_line) => {
                let line_with_newline = format!("{}\n", json_line);
                if let Err(e) = file.write_all(line_with_newline.as_bytes()).await {
                    error!("Failed to write debug log entry: {}", e);
                } else if let Err(e) = file.flush().await {
                    error!("Failed to flush debug log: {}", e);
                }
            }
            Err(e) => {
                error!("Failed to serialize debug log entry for turn {}: {}", entry.turn, e);
            }
        }
    }

    /// Writes an entry and waits for it to reach the file
    pub async fn log_decision_now(&self, state: &GameState, decision: &Decision) {
        if !self.enabled {
            return;
        }
        Self::write_entry(self.file.clone(), DebugLogEntry::new(state, decision)).await;
    }
}
