//! The shared game data model: positions, the map, units and their deltas.
//!
//! These types are deliberately plain data — no behavior lives here beyond
//! small geometric helpers on [`Direction`]. The rules that produce and
//! consume them live in the `engine` crate.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Integer grid coordinates. Origin top-left; `y` increases downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    /// The position obtained by stepping one cell in `direction`.
    pub fn stepped(self, direction: Direction) -> Position {
        let (dx, dy) = direction.offset();
        Position {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Playfield size. The playfield is `[0, width) x [0, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimension {
    pub width: u32,
    pub height: u32,
}

impl Dimension {
    pub fn contains(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as u32) < self.width
            && (position.y as u32) < self.height
    }
}

/// The static part of the map: its size and the impassable wall cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapLayout {
    pub dimension: Dimension,
    pub walls: Vec<Position>,
}

impl MapLayout {
    pub fn is_wall(&self, position: Position) -> bool {
        self.walls.contains(&position)
    }

    /// A cell is enterable when it is on the playfield and not a wall.
    pub fn is_passable(&self, position: Position) -> bool {
        self.dimension.contains(position) && !self.is_wall(position)
    }

    pub fn wall_set(&self) -> HashSet<Position> {
        self.walls.iter().copied().collect()
    }
}

/// One of the eight directions a pawn can step in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::N,
        Direction::NE,
        Direction::E,
        Direction::SE,
        Direction::S,
        Direction::SW,
        Direction::W,
        Direction::NW,
    ];

    /// `(dx, dy)` for a single step in this direction; `y` grows downward.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::N => (0, -1),
            Direction::NE => (1, -1),
            Direction::E => (1, 0),
            Direction::SE => (1, 1),
            Direction::S => (0, 1),
            Direction::SW => (-1, 1),
            Direction::W => (-1, 0),
            Direction::NW => (-1, -1),
        }
    }

    /// Parses one of the eight wire direction strings. Anything else
    /// (including case variants) is rejected — the engine reports this as
    /// `BAD_DIRECTION` rather than letting serde silently drop the frame,
    /// since the direction travels as a plain string on the wire.
    pub fn parse(raw: &str) -> Option<Direction> {
        Some(match raw {
            "N" => Direction::N,
            "NE" => Direction::NE,
            "E" => Direction::E,
            "SE" => Direction::SE,
            "S" => Direction::S,
            "SW" => Direction::SW,
            "W" => Direction::W,
            "NW" => Direction::NW,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::N => "N",
            Direction::NE => "NE",
            Direction::E => "E",
            Direction::SE => "SE",
            Direction::S => "S",
            Direction::SW => "SW",
            Direction::W => "W",
            Direction::NW => "NW",
        }
    }
}

/// The kind of a unit on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitKind {
    Base,
    Pawn,
    Food,
}

/// A single entity on the board. `owner` is `None` iff `kind == Food`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: u64,
    pub owner: Option<String>,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    pub position: Position,
}

impl Unit {
    pub fn is_owned_by(&self, player_id: &str) -> bool {
        self.owner.as_deref() == Some(player_id)
    }
}

/// Milliseconds since the Unix epoch. Kept as a plain integer so deltas
/// remain trivially comparable and serializable.
pub type TimestampMillis = u64;

/// The full, unordered collection of units plus the game's start time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub units: Vec<Unit>,
    pub start_at: TimestampMillis,
}

impl GameState {
    pub fn unit(&self, id: u64) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn units_owned_by(&self, player_id: &str) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(move |u| u.is_owned_by(player_id))
    }

    pub fn base_of(&self, player_id: &str) -> Option<&Unit> {
        self.units_owned_by(player_id)
            .find(|u| u.kind == UnitKind::Base)
    }

    pub fn pawn_count_of(&self, player_id: &str) -> usize {
        self.units_owned_by(player_id)
            .filter(|u| u.kind == UnitKind::Pawn)
            .count()
    }
}

/// The structural diff between two consecutive [`GameState`] snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDelta {
    pub added_or_modified: Vec<Unit>,
    pub removed: Vec<u64>,
    pub timestamp: TimestampMillis,
}

impl GameDelta {
    /// Computes the delta that turns `before` into `after`.
    pub fn between(before: &GameState, after: &GameState, timestamp: TimestampMillis) -> Self {
        let mut added_or_modified = Vec::new();
        for unit in &after.units {
            match before.unit(unit.id) {
                Some(previous) if previous == unit => {}
                _ => added_or_modified.push(unit.clone()),
            }
        }
        let removed: Vec<u64> = before
            .units
            .iter()
            .filter(|u| after.unit(u.id).is_none())
            .map(|u| u.id)
            .collect();
        GameDelta {
            added_or_modified,
            removed,
            timestamp,
        }
    }

    /// Applies this delta to `state` in place, as a client replaying a
    /// session's history would.
    pub fn apply_to(&self, state: &mut GameState) {
        state.units.retain(|u| !self.removed.contains(&u.id));
        for unit in &self.added_or_modified {
            if let Some(existing) = state.units.iter_mut().find(|u| u.id == unit.id) {
                *existing = unit.clone();
            } else {
                state.units.push(unit.clone());
            }
        }
    }
}

/// One player's single action: move unit `unit_id` one step `direction`.
///
/// `direction` is carried as a raw wire string rather than the typed
/// [`Direction`] enum: an unrecognized value must surface to the client as
/// an `INVALID_OPERATION { reason: "BAD_DIRECTION" }` notification (SPEC_FULL
/// §4.1.2), not as a dropped, unparseable frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub unit_id: u64,
    pub direction: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: u64, owner: &str, kind: UnitKind, position: Position) -> Unit {
        Unit {
            id,
            owner: Some(owner.to_string()),
            kind,
            position,
        }
    }

    #[test]
    fn delta_lists_added_modified_and_removed_units() {
        let before = GameState {
            units: vec![
                unit(1, "player-1", UnitKind::Base, Position::new(0, 0)),
                unit(2, "player-1", UnitKind::Pawn, Position::new(1, 0)),
            ],
            start_at: 0,
        };
        let after = GameState {
            units: vec![
                unit(1, "player-1", UnitKind::Base, Position::new(0, 0)),
                unit(2, "player-1", UnitKind::Pawn, Position::new(2, 0)),
                unit(3, "player-1", UnitKind::Pawn, Position::new(0, 0)),
            ],
            start_at: 0,
        };

        let delta = GameDelta::between(&before, &after, 42);

        assert!(delta.removed.is_empty());
        assert_eq!(delta.timestamp, 42);
        let changed_ids: HashSet<u64> = delta.added_or_modified.iter().map(|u| u.id).collect();
        // unit 1 is unchanged and must not appear; 2 moved and 3 is new.
        assert_eq!(changed_ids, HashSet::from([2, 3]));
    }

    #[test]
    fn applying_a_delta_reproduces_the_later_state() {
        let s0 = GameState {
            units: vec![
                unit(1, "player-1", UnitKind::Base, Position::new(0, 0)),
                unit(2, "player-1", UnitKind::Pawn, Position::new(1, 0)),
                unit(3, "player-2", UnitKind::Pawn, Position::new(5, 0)),
            ],
            start_at: 0,
        };
        let s1 = GameState {
            units: vec![
                unit(1, "player-1", UnitKind::Base, Position::new(0, 0)),
                unit(2, "player-1", UnitKind::Pawn, Position::new(2, 0)),
            ],
            start_at: 0,
        };

        let delta = GameDelta::between(&s0, &s1, 7);

        let mut replayed = s0.clone();
        delta.apply_to(&mut replayed);

        let mut replayed_ids: Vec<u64> = replayed.units.iter().map(|u| u.id).collect();
        let mut expected_ids: Vec<u64> = s1.units.iter().map(|u| u.id).collect();
        replayed_ids.sort();
        expected_ids.sort();
        assert_eq!(replayed_ids, expected_ids);
        assert_eq!(replayed.unit(2).unwrap().position, Position::new(2, 0));
    }

    #[test]
    fn a_unit_with_an_unchanged_food_neighbor_is_not_listed_as_modified() {
        let s0 = GameState {
            units: vec![Unit {
                id: 9,
                owner: None,
                kind: UnitKind::Food,
                position: Position::new(4, 4),
            }],
            start_at: 0,
        };
        let s1 = s0.clone();
        let delta = GameDelta::between(&s0, &s1, 1);
        assert!(delta.added_or_modified.is_empty());
        assert!(delta.removed.is_empty());
    }
}

/// Static per-game rules, read once from configuration at process start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub dimension: Dimension,
    pub walls: Vec<Position>,
    pub potential_base_locations: Vec<Position>,
    pub turn_time_limit_ms: u64,
    pub food_scarcity: f64,
    pub fog_of_war: bool,
}

impl GameSettings {
    pub fn map_layout(&self) -> MapLayout {
        MapLayout {
            dimension: self.dimension,
            walls: self.walls.clone(),
        }
    }
}
