//! Shared wire protocol and data model for the game session runtime.
//!
//! This crate has no I/O and no async dependency: it is consumed by the
//! `engine`, `registry`, `orchestrator` and `game-server` crates alike as
//! the single source of truth for what a unit, an action, a delta and a
//! wire message look like.

pub mod arena;
pub mod config;
pub mod message;
pub mod model;

pub use config::{ConfigError, MapConfig, ServerConfig};
pub use message::{ClientMessage, FrameError, GameEnd, GameStart, ServerMessage};
pub use model::{
    Action, Dimension, Direction, GameDelta, GameSettings, GameState, MapLayout, Position,
    TimestampMillis, Unit, UnitKind,
};

/// The first attached connection always becomes `player-1`, the second
/// `player-2` (SPEC_FULL §6.1 identity assignment rule).
pub fn seat_player_id(seat_index: usize) -> String {
    format!("player-{}", seat_index + 1)
}
