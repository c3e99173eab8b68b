//! Base-state termination detection (SPEC_FULL §4.1.3).
//!
//! This only covers the conditions the world engine itself can observe
//! from a `GameState`. Timeout, disconnect and stall-bound termination are
//! orchestrator-level causes layered on top (SPEC_FULL §4.3) and are not
//! modeled here.

use protocol::GameState;

/// The engine-observable outcome of a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The game continues.
    Ongoing,
    /// The named seated player has won.
    Winner(String),
    /// The game has ended with no winner.
    Draw,
}

/// Checks the three engine-level ending conditions against `state` for the
/// given `seated_players` (in seat order).
pub fn check_termination(state: &GameState, seated_players: &[String]) -> Termination {
    if state.units.is_empty() {
        return Termination::Draw;
    }

    if seated_players.len() >= 2 {
        let with_base: Vec<&String> = seated_players
            .iter()
            .filter(|p| state.base_of(p).is_some())
            .collect();
        if with_base.len() < 2 {
            return match with_base.len() {
                1 => Termination::Winner(with_base[0].clone()),
                _ => Termination::Draw,
            };
        }
    }

    let with_pawns: Vec<&String> = seated_players
        .iter()
        .filter(|p| state.pawn_count_of(p) > 0)
        .collect();
    let pawnless_exists = with_pawns.len() < seated_players.len();
    if pawnless_exists {
        return match with_pawns.len() {
            1 => Termination::Winner(with_pawns[0].clone()),
            0 => Termination::Draw,
            _ => Termination::Ongoing,
        };
    }

    Termination::Ongoing
}

/// The seated player other than `player_id` — used by forfeit paths
/// (timeout, disconnect) where the opponent always wins. Panics only if
/// `seated_players` does not actually contain two distinct entries
/// including `player_id`, which the orchestrator guarantees by
/// construction.
pub fn opponent_of<'a>(seated_players: &'a [String], player_id: &str) -> Option<&'a String> {
    seated_players.iter().find(|p| p.as_str() != player_id)
}
