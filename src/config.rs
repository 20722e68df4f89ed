// Configuration module for reading Snake.toml
// Every tunable of the decision engine lives here instead of in the code

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Upper bound for `search.branching_opponents`; a minimizing ply has at
/// most 4^MAX_BRANCHING_OPPONENTS joint replies
pub const MAX_BRANCHING_OPPONENTS: usize = 6;

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub timing: TimingConfig,
    pub search: SearchConfig,
    pub scores: ScoresConfig,
    pub game_rules: GameRulesConfig,
    pub debug: DebugConfig,
}

/// Timing and iterative deepening constants
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    pub response_time_budget_ms: u64,
    pub network_overhead_ms: u64,
    pub polling_interval_ms: u64,
    pub initial_depth: u8,
    pub depth_increment: u8,
    pub max_search_depth: u8,
}

impl TimingConfig {
    /// Computes the effective computation budget
    pub fn effective_budget_ms(&self) -> u64 {
        self.response_time_budget_ms.saturating_sub(self.network_overhead_ms)
    }
}

/// How the minimizing ply picks among opponent replies
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MinimizerPolicy {
    /// Opponents play the reply that is worst for us; alpha-beta pruning on
    AlphaBeta,
    /// Opponents pick replies with probability decreasing in our score
    Weighted,
}

/// Search behaviour
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    pub policy: MinimizerPolicy,
    /// Base `b` of the opponent selection weight `b^-(v - v_min)`
    pub opponent_weight_base: f64,
    /// Opponents nearest to our head that try all four moves at a
    /// minimizing ply; the rest play one fixed safe move
    pub branching_opponents: usize,
    /// Fixed seed for tie-breaking and opponent sampling
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Evaluator term weights
#[derive(Debug, Deserialize, Clone)]
pub struct ScoresConfig {
    pub food_weight: i32,
    pub length_weight: i32,
    /// Extra length units granted at full health
    pub full_health_bonus: i32,
    pub hazard_penalty: i32,

    // Reachable space
    pub flood_fill_horizon: u32,
    pub flood_fill_weight: i32,

    // Chase when longer, flee when shorter
    pub aggression_enabled: bool,
    pub aggression_distance: i32,
    pub aggression_weight: i32,
}

/// Game rules constants
#[derive(Debug, Deserialize, Clone)]
pub struct GameRulesConfig {
    pub health_on_food: u8,
    pub health_loss_per_turn: u8,
    pub hazard_damage: u8,
}

/// Debug configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Snake.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config, String>` - Parsed configuration or error message
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, String> {
        let config: Config =
            toml::from_str(contents).map_err(|e| format!("Failed to parse config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads default configuration from Snake.toml in the project root
    pub fn load_default() -> Result<Self, String> {
        Self::from_file("Snake.toml")
    }

    /// Rejects values the search cannot work with
    pub fn validate(&self) -> Result<(), String> {
        let t = &self.timing;
        if t.initial_depth == 0 {
            return Err("timing.initial_depth must be at least 1".to_string());
        }
        if t.depth_increment == 0 {
            return Err("timing.depth_increment must be at least 1".to_string());
        }
        if t.max_search_depth < t.initial_depth {
            return Err(format!(
                "timing.max_search_depth ({}) is below timing.initial_depth ({})",
                t.max_search_depth, t.initial_depth
            ));
        }
        if t.max_search_depth >= 100 {
            return Err("timing.max_search_depth must stay below 100".to_string());
        }
        if t.polling_interval_ms == 0 {
            return Err("timing.polling_interval_ms must be positive".to_string());
        }
        if !(self.search.opponent_weight_base > 1.0) {
            return Err("search.opponent_weight_base must be greater than 1".to_string());
        }
        if !(1..=MAX_BRANCHING_OPPONENTS).contains(&self.search.branching_opponents) {
            return Err(format!(
                "search.branching_opponents must be between 1 and {}",
                MAX_BRANCHING_OPPONENTS
            ));
        }
        Ok(())
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the constants defined in Snake.toml
    pub fn default_hardcoded() -> Self {
        Config {
            timing: TimingConfig {
                response_time_budget_ms: 400,
                network_overhead_ms: 50,
                polling_interval_ms: 10,
                initial_depth: 2,
                depth_increment: 2,
                max_search_depth: 40,
            },
            search: SearchConfig {
                policy: MinimizerPolicy::Weighted,
                opponent_weight_base: 1.01,
                branching_opponents: 3,
                seed: None,
            },
            scores: ScoresConfig {
                food_weight: 1,
                length_weight: 25,
                full_health_bonus: 1,
                hazard_penalty: 3,
                flood_fill_horizon: 10,
                flood_fill_weight: 1,
                aggression_enabled: false,
                aggression_distance: 2,
                aggression_weight: 100,
            },
            game_rules: GameRulesConfig {
                health_on_food: 100,
                health_loss_per_turn: 1,
                hazard_damage: 15,
            },
            debug: DebugConfig {
                enabled: false,
                log_file_path: "battlesnake_debug.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            log::warn!("Could not load Snake.toml ({}), using hardcoded defaults", e);
            Self::default_hardcoded()
        })
    }
}
