//! Per-connection handling: the websocket handshake, the writer task
//! that serializes one player's outbound frames, and the reader loop
//! that feeds parsed frames to the orchestrator (SPEC_FULL §4.4, §5).
//!
//! Grounded on the teacher's `main::websocket` (split socket, run
//! handshake, dispatch to a per-role task, shut down on exit) and
//! `hand_shake.rs`'s race-safe "attach, then inform the peer" sequence —
//! generalized from a binary postcard handshake exchanging numeric
//! client ids to a JSON `PLAYER_ASSIGNED` frame carrying the stable
//! `player-N` identity the [`registry::Registry`] just assigned.

use crate::ServerState;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;
use protocol::message::encode_server_message;
use protocol::ServerMessage;
use registry::RegistryError;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Outbound channel depth per connection: a handful of lifecycle events
/// plus at most one pending `NEXT_TURN`/`INVALID_OPERATION` at a time.
const OUTBOUND_CHANNEL_CAPACITY: usize = 16;

/// Drives one client connection end to end: attach, handshake, relay in
/// both directions, detach. Mirrors the teacher's single `websocket`
/// entry point that owns a connection's whole lifetime.
pub async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    let (sender, mut receiver) = socket.split();
    let sender = Arc::new(Mutex::new(sender));

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_CHANNEL_CAPACITY);

    let player_id = match state.registry.attach(outbound_tx.clone()) {
        Ok(player_id) => player_id,
        Err(RegistryError::RoomFull) => {
            close_with_reason(&sender, 1013, "capacity-exceeded: the match already has two seated players").await;
            return;
        }
        Err(other) => {
            tracing::error!(error = %other, "unexpected registry error on attach");
            close_with_reason(&sender, 1011, "unable to join the match").await;
            return;
        }
    };

    // Queued ahead of anything else so ordering (SPEC_FULL §4.4's
    // per-player serialization) gives the client its identity first.
    if outbound_tx
        .send(ServerMessage::PlayerAssigned {
            player_id: player_id.clone(),
        })
        .await
        .is_err()
    {
        state.registry.detach(&player_id);
        return;
    }

    tracing::info!(player_id = %player_id, "player connected");

    let writer_sender = sender.clone();
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let text = encode_server_message(&message);
            let mut guard = writer_sender.lock().await;
            if guard.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    state.handle.notify_attached().await;

    while let Some(frame) = receiver.next().await {
        let message = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                tracing::warn!(player_id = %player_id, error = %err, "websocket read error");
                break;
            }
        };

        if let Err(err) = state.handle.submit_frame(&player_id, &message).await {
            tracing::warn!(player_id = %player_id, error = %err, "rejected inbound frame");
        }
    }

    writer_task.abort();
    state.registry.detach(&player_id);
    state.handle.notify_disconnected(player_id.clone()).await;
    tracing::info!(player_id = %player_id, "player disconnected");
}

/// Sends a best-effort close frame carrying a human-readable reason, for
/// connections rejected before they ever reach the orchestrator (e.g. a
/// third client arriving once both seats are taken; SPEC_FULL §4.2's
/// "the boundary MUST close such connections with a capacity-exceeded
/// reason").
async fn close_with_reason(sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>, code: u16, reason: &str) {
    let mut guard = sender.lock().await;
    let frame = CloseFrame {
        code,
        reason: reason.to_string().into(),
    };
    let _ = guard.send(Message::Close(Some(frame))).await;
}
