//! Turn sequencing and the message boundary for one two-player match
//! (SPEC_FULL §4.3 / §4.4).
//!
//! This crate is the only caller of `engine`'s state-mutating operations
//! and the only writer of `registry`'s seats: every other component only
//! enqueues events onto an [`OrchestratorHandle`] and reads the resulting
//! [`session::StatusSnapshot`].

mod driver;
mod event;
mod session;

pub use driver::{now_ms, MatchOutcome, Orchestrator};
pub use event::{FrameRejected, InboundEvent, OrchestratorHandle, TurnToken};
pub use session::{Phase, StatusSnapshot};
