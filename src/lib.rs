// Library exports for the minimax Battlesnake
// The server binary, the replay tool and the integration tests all drive the
// decision engine through these modules.

pub mod board;
pub mod bot;
pub mod config;
pub mod debug_logger;
pub mod eval;
pub mod replay;
pub mod score;
pub mod search;
pub mod simulator;
pub mod timing;
pub mod types;
