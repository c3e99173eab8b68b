//! The pure world engine: state initialization, action resolution and
//! termination detection for a two-player strategy match (SPEC_FULL §4.1).
//!
//! This crate touches neither the network nor the clock: every entry
//! point takes the timestamp it needs as an argument and returns plain
//! data. The `orchestrator` crate is the only caller.

pub mod error;
mod rules;
pub mod termination;

pub use error::{format_reasons, ActionError};
pub use termination::{check_termination, opponent_of, Termination};

use protocol::{Action, GameDelta, GameSettings, GameState, TimestampMillis};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Holds the rules for one match plus the two pieces of mutable state a
/// pure engine still needs: a monotonic id counter and a random source
/// for food placement.
pub struct Engine {
    pub settings: GameSettings,
    next_id: u64,
    rng: StdRng,
}

impl Engine {
    /// Builds an engine seeded from the OS entropy source.
    pub fn new(settings: GameSettings) -> Self {
        Engine {
            settings,
            next_id: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Builds an engine with a deterministic random source, for
    /// reproducible tests and replays.
    pub fn with_seed(settings: GameSettings, seed: u64) -> Self {
        Engine {
            settings,
            next_id: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn fresh_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Builds the opening state for a fully-seated match: one BASE and
    /// one PAWN per seat, plus the opening food roll.
    pub fn initialize(&mut self, seated_players: &[String], now_ms: TimestampMillis) -> GameState {
        rules::initialize(self, seated_players, now_ms)
    }

    /// Validates and applies one player's action batch, returning the
    /// resulting state and the delta from `state`, or the list of
    /// reasons the whole batch was rejected.
    pub fn apply_actions(
        &mut self,
        state: &GameState,
        player_id: &str,
        actions: &[Option<Action>],
        now_ms: TimestampMillis,
    ) -> Result<(GameState, GameDelta), Vec<ActionError>> {
        rules::apply_actions(self, state, player_id, actions, now_ms)
    }

    /// The state a client should see, with fog of war applied if the
    /// match settings enable it (SPEC_FULL's Open Question on visibility).
    /// Units owned by the viewer and all FOOD are always visible; an
    /// opponent's units are visible only within one cell (any of the
    /// eight neighbors, inclusive) of a unit the viewer owns.
    pub fn project_for(&self, state: &GameState, viewer_id: &str) -> GameState {
        if !self.settings.fog_of_war {
            return state.clone();
        }

        let visible_from: Vec<protocol::Position> = state
            .units_owned_by(viewer_id)
            .map(|u| u.position)
            .collect();

        let units = state
            .units
            .iter()
            .filter(|unit| {
                unit.is_owned_by(viewer_id)
                    || unit.kind == protocol::UnitKind::Food
                    || visible_from.iter().any(|&p| within_one_cell(p, unit.position))
            })
            .cloned()
            .collect();

        GameState {
            units,
            start_at: state.start_at,
        }
    }
}

fn within_one_cell(a: protocol::Position, b: protocol::Position) -> bool {
    (a.x - b.x).abs() <= 1 && (a.y - b.y).abs() <= 1
}
