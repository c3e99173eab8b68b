//! Process-level configuration.
//!
//! Loaded once at startup and re-loadable at runtime through the `/reload`
//! HTTP endpoint, mirroring the teacher's `lobby::reload_config` hot-reload
//! contract — generalized here from a directory of per-game player caps to
//! this process's single game's settings.

use crate::model::{Dimension, Position};
use serde::{Deserialize, Serialize};

/// The map portion of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfig {
    pub dimension: Dimension,
    pub walls: Vec<Position>,
    pub potential_base_locations: Vec<Position>,
}

/// The full process configuration, read from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub port: u16,
    pub map_config: MapConfig,
    pub turn_time_limit_ms: u64,
    pub protocol_version: u32,
    #[serde(default = "default_food_scarcity")]
    pub food_scarcity: f64,
    #[serde(default)]
    pub fog_of_war: bool,
    #[serde(default = "default_stall_round_limit")]
    pub stall_round_limit: u32,
}

fn default_food_scarcity() -> f64 {
    0.9
}

fn default_stall_round_limit() -> u32 {
    1000
}

impl ServerConfig {
    /// Validates the invariants SPEC_FULL §6.2 mandates at the process
    /// surface: `port` must be in the registered/dynamic range and the
    /// per-turn deadline must be strictly positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1024..=65535).contains(&self.port) {
            return Err(ConfigError::PortOutOfRange(self.port));
        }
        if self.turn_time_limit_ms == 0 {
            return Err(ConfigError::NonPositiveTurnTimeLimit);
        }
        if !(0.0..=1.0).contains(&self.food_scarcity) {
            return Err(ConfigError::FoodScarcityOutOfRange(self.food_scarcity));
        }
        if self.map_config.potential_base_locations.is_empty() {
            return Err(ConfigError::NoBaseLocations);
        }
        Ok(())
    }
}

/// Why a loaded configuration was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(String),
    #[error("failed to parse config file: {0}")]
    Parse(String),
    #[error("port {0} is outside the allowed range 1024..=65535")]
    PortOutOfRange(u16),
    #[error("turnTimeLimit must be greater than zero")]
    NonPositiveTurnTimeLimit,
    #[error("foodScarcity {0} is outside the allowed range [0, 1]")]
    FoodScarcityOutOfRange(f64),
    #[error("mapConfig.potentialBaseLocations must not be empty")]
    NoBaseLocations,
    #[error("arena map error: {0}")]
    Arena(#[from] crate::arena::ArenaError),
}
