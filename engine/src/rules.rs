//! Action validation, movement and collision resolution (SPEC_FULL §4.1).
//!
//! Everything here is a pure function of its arguments plus the engine's
//! id counter and random source: no I/O, no clocks beyond the `now_ms`
//! the caller supplies.

use crate::error::ActionError;
use crate::Engine;
use protocol::{Action, Direction, GameDelta, GameState, MapLayout, Position, TimestampMillis, Unit, UnitKind};
use std::collections::{HashMap, HashSet};

/// An action whose unit and direction have already passed validation.
struct ResolvedAction {
    unit_id: u64,
    direction: Direction,
}

/// Places a BASE and PAWN for every seated player and rolls the opening
/// food spawn (SPEC_FULL §4.1.1).
pub(crate) fn initialize(engine: &mut Engine, seated_players: &[String], now_ms: TimestampMillis) -> GameState {
    let map = engine.settings.map_layout();
    let mut units = Vec::new();

    for (seat, player_id) in seated_players.iter().enumerate() {
        let base_position = engine.settings.potential_base_locations[seat];
        units.push(Unit {
            id: engine.fresh_id(),
            owner: Some(player_id.clone()),
            kind: UnitKind::Base,
            position: base_position,
        });

        let pawn_position = first_passable_neighbor(&map, base_position).unwrap_or(base_position);
        units.push(Unit {
            id: engine.fresh_id(),
            owner: Some(player_id.clone()),
            kind: UnitKind::Pawn,
            position: pawn_position,
        });
    }

    let mut units = units;
    maybe_spawn_food(engine, &map, &mut units);
    GameState { units, start_at: now_ms }
}

/// Tries `E, S, W, N, NE, SE, SW, NW` around `base_position` in that
/// fixed order and returns the first in-bounds, non-wall cell.
fn first_passable_neighbor(map: &MapLayout, base_position: Position) -> Option<Position> {
    const SEARCH_ORDER: [Direction; 8] = [
        Direction::E,
        Direction::S,
        Direction::W,
        Direction::N,
        Direction::NE,
        Direction::SE,
        Direction::SW,
        Direction::NW,
    ];
    SEARCH_ORDER
        .iter()
        .map(|&direction| base_position.stepped(direction))
        .find(|&candidate| map.is_passable(candidate))
}

/// Validates, applies and resolves one player's action batch against
/// `state`, returning the new state and its delta from `state`, or the
/// full list of reasons the batch was rejected (SPEC_FULL §4.1.2).
pub(crate) fn apply_actions(
    engine: &mut Engine,
    state: &GameState,
    player_id: &str,
    actions: &[Option<Action>],
    now_ms: TimestampMillis,
) -> Result<(GameState, GameDelta), Vec<ActionError>> {
    let resolved = validate(state, player_id, actions)?;
    let map = engine.settings.map_layout();

    let moved = apply_movement(state, &map, &resolved);
    let (mut survivors, food_consumed) = resolve_collisions(moved);

    if food_consumed > 0 {
        if let Some(base) = survivors
            .iter()
            .find(|u| u.kind == UnitKind::Base && u.is_owned_by(player_id))
        {
            let base_position = base.position;
            for _ in 0..food_consumed {
                survivors.push(Unit {
                    id: engine.fresh_id(),
                    owner: Some(player_id.to_string()),
                    kind: UnitKind::Pawn,
                    position: base_position,
                });
            }
        }
    }

    maybe_spawn_food(engine, &map, &mut survivors);

    let new_state = GameState {
        units: survivors,
        start_at: state.start_at,
    };
    let delta = GameDelta::between(state, &new_state, now_ms);
    Ok((new_state, delta))
}

/// Checks one action batch against `state` without mutating anything.
/// Collects every violation rather than stopping at the first, since
/// `INVALID_OPERATION.reason` is expected to describe the whole batch.
fn validate(
    state: &GameState,
    player_id: &str,
    actions: &[Option<Action>],
) -> Result<Vec<ResolvedAction>, Vec<ActionError>> {
    let mut unit_id_counts: HashMap<u64, usize> = HashMap::new();
    for action in actions.iter().flatten() {
        *unit_id_counts.entry(action.unit_id).or_insert(0) += 1;
    }
    let duplicated: HashSet<u64> = unit_id_counts
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|(id, _)| id)
        .collect();

    let mut errors = Vec::new();
    let mut resolved = Vec::new();

    for entry in actions {
        let Some(action) = entry else {
            errors.push(ActionError::NullAction);
            continue;
        };
        if duplicated.contains(&action.unit_id) {
            errors.push(ActionError::DuplicateAction(action.unit_id));
            continue;
        }
        match state.unit(action.unit_id) {
            None => errors.push(ActionError::UnknownUnit(action.unit_id)),
            Some(unit) if !unit.is_owned_by(player_id) => {
                errors.push(ActionError::ForeignUnit(action.unit_id))
            }
            Some(unit) if unit.kind != UnitKind::Pawn => {
                errors.push(ActionError::NotMovable(action.unit_id, unit.kind))
            }
            Some(_) => match Direction::parse(&action.direction) {
                None => errors.push(ActionError::BadDirection(action.direction.clone())),
                Some(direction) => resolved.push(ResolvedAction {
                    unit_id: action.unit_id,
                    direction,
                }),
            },
        }
    }

    if errors.is_empty() {
        Ok(resolved)
    } else {
        Err(errors)
    }
}

/// Applies a validated batch of moves, leaving every unit not named in
/// `resolved` where it stood. A move into a wall or off the map is a
/// silent no-op (SPEC_FULL §4.1.2), not a validation failure.
fn apply_movement(state: &GameState, map: &MapLayout, resolved: &[ResolvedAction]) -> Vec<Unit> {
    state
        .units
        .iter()
        .map(|unit| {
            let Some(action) = resolved.iter().find(|r| r.unit_id == unit.id) else {
                return unit.clone();
            };
            let target = unit.position.stepped(action.direction);
            let position = if map.is_passable(target) {
                target
            } else {
                unit.position
            };
            Unit { position, ..unit.clone() }
        })
        .collect()
}

/// Resolves every cell with more than one occupant per the four-row
/// collision table (SPEC_FULL §4.1.2), returning the surviving units and
/// the count of FOOD consumed (for the reinforcement rule, applied by the
/// caller against the *acting* player's base).
fn resolve_collisions(units: Vec<Unit>) -> (Vec<Unit>, usize) {
    let mut by_position: HashMap<Position, Vec<usize>> = HashMap::new();
    for (index, unit) in units.iter().enumerate() {
        by_position.entry(unit.position).or_default().push(index);
    }

    let mut removed: HashSet<u64> = HashSet::new();
    let mut food_consumed = 0usize;

    for indices in by_position.values() {
        if indices.len() < 2 {
            continue;
        }
        let occupants: Vec<&Unit> = indices.iter().map(|&i| &units[i]).collect();
        let bases: Vec<&Unit> = occupants.iter().copied().filter(|u| u.kind == UnitKind::Base).collect();
        let pawns: Vec<&Unit> = occupants.iter().copied().filter(|u| u.kind == UnitKind::Pawn).collect();
        let foods: Vec<&Unit> = occupants.iter().copied().filter(|u| u.kind == UnitKind::Food).collect();

        let mut base_incursion = false;
        for base in &bases {
            let owner = base.owner.as_deref().unwrap_or_default();
            let enemy_pawns: Vec<&&Unit> = pawns
                .iter()
                .filter(|p| p.owner.as_deref() != Some(owner))
                .collect();
            if !enemy_pawns.is_empty() {
                base_incursion = true;
                removed.insert(base.id);
                for pawn in enemy_pawns {
                    removed.insert(pawn.id);
                }
            }
        }
        if base_incursion {
            continue;
        }

        if pawns.len() >= 2 {
            let distinct_owners: HashSet<&str> =
                pawns.iter().filter_map(|p| p.owner.as_deref()).collect();
            if distinct_owners.len() >= 2 {
                for pawn in &pawns {
                    removed.insert(pawn.id);
                }
                continue;
            }
        }

        if !foods.is_empty() && !pawns.is_empty() {
            for food in &foods {
                removed.insert(food.id);
            }
            food_consumed += foods.len();
        }
    }

    let survivors = units.into_iter().filter(|u| !removed.contains(&u.id)).collect();
    (survivors, food_consumed)
}

/// Rolls the per-turn food spawn: with probability `1 - foodScarcity`,
/// places one FOOD unit on a random unoccupied, non-wall cell, retrying
/// up to `2 * width * height` times before giving up silently (SPEC_FULL
/// §4.1.1 / §4.1.2).
fn maybe_spawn_food(engine: &mut Engine, map: &MapLayout, units: &mut Vec<Unit>) {
    use rand::Rng;

    let roll: f64 = engine.rng.gen();
    if roll < engine.settings.food_scarcity {
        return;
    }

    let width = map.dimension.width;
    let height = map.dimension.height;
    if width == 0 || height == 0 {
        return;
    }
    let occupied: HashSet<Position> = units.iter().map(|u| u.position).collect();
    let attempts = 2 * (width as usize) * (height as usize);

    for _ in 0..attempts {
        let x = engine.rng.gen_range(0..width) as i32;
        let y = engine.rng.gen_range(0..height) as i32;
        let candidate = Position::new(x, y);
        if map.is_passable(candidate) && !occupied.contains(&candidate) {
            units.push(Unit {
                id: engine.fresh_id(),
                owner: None,
                kind: UnitKind::Food,
                position: candidate,
            });
            return;
        }
    }
}
