//! The message boundary (SPEC_FULL §4.4): translates parsed client frames
//! into typed events for the driver, and stamps each action submission
//! with the implicit round tag the wire protocol itself does not carry.
//!
//! Frame parsing and the blank/malformed rejection contract live in
//! `protocol::message`; this module only adds the orchestrator-specific
//! half of the boundary — turning a `ClientMessage` into an `InboundEvent`
//! and rejecting a frame whose claimed `playerId` does not match the
//! connection it arrived on.

use crate::session::StatusSnapshot;
use protocol::{Action, ClientMessage, FrameError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};

/// Everything the driver's single-consumer inbox can receive.
#[derive(Debug)]
pub enum InboundEvent {
    /// A seat was just attached; re-check `registry.ready()`.
    PlayerAttached,
    /// A player's connection closed.
    Disconnected { player_id: String },
    /// A parsed `ACTION` frame, stamped with the round tag in effect at
    /// the moment the message boundary received it.
    ActionSubmitted {
        player_id: String,
        turn_tag: u64,
        actions: Vec<Option<Action>>,
    },
    /// Cooperative shutdown request (SPEC_FULL §5).
    Shutdown,
}

/// A monotonic counter the driver advances once per half-turn. The wire
/// protocol carries no round tag (SPEC_FULL §6.1's `ACTION` shape is just
/// `{ type, playerId, actions }`), so this stands in for the "implicit...
/// round tag" SPEC_FULL §4.3.2 requires: the message boundary reads the
/// current value when a frame arrives, and the driver later compares that
/// reading against its own current value to tell a live submission from
/// a stale one that arrived after the half-turn it was meant for ended.
#[derive(Clone, Default)]
pub struct TurnToken(Arc<AtomicU64>);

impl TurnToken {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// A handle connection tasks use to feed the driver and to stamp outbound
/// action frames with the current round tag. Cheap to clone.
#[derive(Clone)]
pub struct OrchestratorHandle {
    inbox: mpsc::Sender<InboundEvent>,
    turn_token: TurnToken,
    status: Arc<RwLock<StatusSnapshot>>,
}

impl OrchestratorHandle {
    pub(crate) fn new(
        inbox: mpsc::Sender<InboundEvent>,
        turn_token: TurnToken,
        status: Arc<RwLock<StatusSnapshot>>,
    ) -> Self {
        OrchestratorHandle {
            inbox,
            turn_token,
            status,
        }
    }

    /// A point-in-time read of the match's progress, for a `/status`
    /// HTTP handler.
    pub async fn status(&self) -> StatusSnapshot {
        self.status.read().await.clone()
    }

    /// Tells the driver a seat was just attached, so it can re-check
    /// readiness. Best-effort: a closed inbox means the driver already
    /// shut down.
    pub async fn notify_attached(&self) {
        let _ = self.inbox.send(InboundEvent::PlayerAttached).await;
    }

    pub async fn notify_disconnected(&self, player_id: String) {
        let _ = self.inbox.send(InboundEvent::Disconnected { player_id }).await;
    }

    /// Cooperative shutdown (SPEC_FULL §5): aborts the current deadline
    /// wait, if any, so the driver falls through to its best-effort
    /// `END_GAME` broadcast and returns.
    pub async fn request_shutdown(&self) {
        let _ = self.inbox.send(InboundEvent::Shutdown).await;
    }

    /// Parses a raw inbound frame and, if it is a well-formed `ACTION`
    /// addressed to `expected_player_id`, forwards it to the driver.
    /// A malformed, blank or misaddressed frame is rejected here and
    /// never reaches the driver (SPEC_FULL §4.4 / §7's protocol-error
    /// row: "log, drop, do not propagate").
    pub async fn submit_frame(&self, expected_player_id: &str, raw: &str) -> Result<(), FrameRejected> {
        let message = protocol::message::parse_client_frame(raw)?;
        let ClientMessage::Action { player_id, actions } = message;
        if player_id != expected_player_id {
            return Err(FrameRejected::PlayerMismatch {
                expected: expected_player_id.to_string(),
                claimed: player_id,
            });
        }
        let turn_tag = self.turn_token.current();
        let _ = self
            .inbox
            .send(InboundEvent::ActionSubmitted {
                player_id,
                turn_tag,
                actions,
            })
            .await;
        Ok(())
    }
}

/// Why a frame never reached the driver.
#[derive(Debug, Error)]
pub enum FrameRejected {
    #[error(transparent)]
    Malformed(#[from] FrameError),
    #[error("frame claimed playerId {claimed} on the connection for {expected}")]
    PlayerMismatch { expected: String, claimed: String },
}
