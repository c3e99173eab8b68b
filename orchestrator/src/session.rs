//! Session state (SPEC_FULL §3): the bookkeeping the driver carries
//! alongside the `GameState` it hands to the engine.

use serde::Serialize;

/// The top-level phase of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Waiting,
    Running,
    Ended,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Waiting => "waiting",
            Phase::Running => "running",
            Phase::Ended => "ended",
        }
    }
}

/// A read-only snapshot of the driver's progress, for the `/status`
/// endpoint. Updated by the driver after every phase or round change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub phase: Phase,
    pub round_index: u64,
    pub seated_count: usize,
    pub winner_id: Option<String>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        StatusSnapshot {
            phase: Phase::Waiting,
            round_index: 0,
            seated_count: 0,
            winner_id: None,
        }
    }
}
