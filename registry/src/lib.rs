//! The session registry: seat assignment and outbound message delivery
//! for exactly one two-player match (SPEC_FULL §4.2).
//!
//! A [`Registry`] holds no game state of its own — only which seat each
//! connected player occupies and the channel used to push that player's
//! outbound frames. The `orchestrator` crate is the only caller that
//! interprets what gets sent.

use protocol::{seat_player_id, ServerMessage};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// This game seats exactly two players; there is no lobby beyond that.
pub const CAPACITY: usize = 2;

/// A send to a single peer may not block the driver past this bound
/// (SPEC_FULL §5); a peer still unreachable after this long is treated
/// the same as a closed channel.
const SEND_TIMEOUT: Duration = Duration::from_secs(1);

struct Seat {
    player_id: String,
    outbound: mpsc::Sender<ServerMessage>,
    connected: bool,
}

struct State {
    seats: Vec<Seat>,
}

/// Seat assignment and per-player message delivery for one match.
pub struct Registry {
    state: Mutex<State>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            state: Mutex::new(State { seats: Vec::new() }),
        }
    }

    /// Assigns a seat to a newly connected player and stores its outbound
    /// channel. A seat left behind by an earlier disconnect is reused
    /// first, handing the new occupant that seat's identity (SPEC_FULL
    /// §6.1: "re-use of a freed slot issues the same identity to the new
    /// occupant"); only once every existing seat is connected does a
    /// fresh one get pushed — the first ever caller becomes `player-1`,
    /// the second `player-2`. A third concurrent occupant, with both
    /// seats still connected, is rejected with [`RegistryError::RoomFull`]
    /// since spectators are out of scope.
    pub fn attach(&self, outbound: mpsc::Sender<ServerMessage>) -> Result<String, RegistryError> {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        if let Some(seat) = state.seats.iter_mut().find(|s| !s.connected) {
            seat.outbound = outbound;
            seat.connected = true;
            return Ok(seat.player_id.clone());
        }
        if state.seats.len() >= CAPACITY {
            return Err(RegistryError::RoomFull);
        }
        let player_id = seat_player_id(state.seats.len());
        state.seats.push(Seat {
            player_id: player_id.clone(),
            outbound,
            connected: true,
        });
        Ok(player_id)
    }

    /// True once both seats are occupied and neither has disconnected.
    pub fn is_ready(&self) -> bool {
        let state = self.state.lock().expect("registry mutex poisoned");
        state.seats.len() == CAPACITY && state.seats.iter().all(|s| s.connected)
    }

    /// The seated players, in seat order. Stable for the life of the
    /// match even after a seat disconnects.
    pub fn seated_players(&self) -> Vec<String> {
        let state = self.state.lock().expect("registry mutex poisoned");
        state.seats.iter().map(|s| s.player_id.clone()).collect()
    }

    /// Sends `message` to the named player only. A disconnected or
    /// unknown seat is reported, never silently dropped. A send failure
    /// or timeout marks the seat detached itself (SPEC_FULL §4.2: "drop
    /// silently and mark the seat as detached") rather than leaving that
    /// bookkeeping to whichever reader loop eventually notices the same
    /// connection is gone.
    pub async fn unicast(&self, player_id: &str, message: ServerMessage) -> Result<(), RegistryError> {
        let sender = {
            let state = self.state.lock().expect("registry mutex poisoned");
            let seat = state
                .seats
                .iter()
                .find(|s| s.player_id == player_id)
                .ok_or_else(|| RegistryError::UnknownPlayer(player_id.to_string()))?;
            if !seat.connected {
                return Err(RegistryError::Disconnected(player_id.to_string()));
            }
            seat.outbound.clone()
        };
        match tokio::time::timeout(SEND_TIMEOUT, sender.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => {
                self.detach(player_id);
                Err(RegistryError::Disconnected(player_id.to_string()))
            }
            Err(_) => {
                tracing::warn!(player_id = %player_id, "send timed out, treating as disconnected");
                self.detach(player_id);
                Err(RegistryError::Disconnected(player_id.to_string()))
            }
        }
    }

    /// Sends `message` to every connected seat. Delivery failures are
    /// logged and otherwise ignored: a broadcast never fails as a whole
    /// because one peer has already gone away. As with `unicast`, a failed
    /// or timed-out send marks that seat detached (SPEC_FULL §4.2).
    pub async fn broadcast(&self, message: ServerMessage) {
        let targets: Vec<(String, mpsc::Sender<ServerMessage>)> = {
            let state = self.state.lock().expect("registry mutex poisoned");
            state
                .seats
                .iter()
                .filter(|s| s.connected)
                .map(|s| (s.player_id.clone(), s.outbound.clone()))
                .collect()
        };
        for (player_id, sender) in targets {
            match tokio::time::timeout(SEND_TIMEOUT, sender.send(message.clone())).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => {
                    tracing::warn!(player_id = %player_id, "dropped broadcast to a disconnected seat");
                    self.detach(&player_id);
                }
                Err(_) => {
                    tracing::warn!(player_id = %player_id, "broadcast send timed out, treating as disconnected");
                    self.detach(&player_id);
                }
            }
        }
    }

    /// Marks a seat disconnected and available for reuse by a future
    /// `attach` (SPEC_FULL §4.3.1: "if in WAITING, simply free the seat
    /// and continue waiting"). The seat's identity in `seated_players`
    /// is preserved in the meantime — there is no reconnection of the
    /// same player, but a *different* new connection may later take this
    /// slot and inherit its `player_id`, per SPEC_FULL §6.1.
    pub fn detach(&self, player_id: &str) {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        if let Some(seat) = state.seats.iter_mut().find(|s| s.player_id == player_id) {
            seat.connected = false;
        }
    }
}

/// Why a registry operation was rejected.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("the match already has two seated players")]
    RoomFull,
    #[error("no seat is assigned to player {0}")]
    UnknownPlayer(String),
    #[error("player {0} has disconnected")]
    Disconnected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_two_attaches_get_player_one_and_two() {
        let registry = Registry::new();
        let (tx1, _rx1) = mpsc::channel(8);
        let (tx2, _rx2) = mpsc::channel(8);
        assert_eq!(registry.attach(tx1).unwrap(), "player-1");
        assert_eq!(registry.attach(tx2).unwrap(), "player-2");
        assert!(registry.is_ready());
    }

    #[test]
    fn a_third_attach_is_rejected() {
        let registry = Registry::new();
        let (tx1, _rx1) = mpsc::channel(8);
        let (tx2, _rx2) = mpsc::channel(8);
        let (tx3, _rx3) = mpsc::channel(8);
        registry.attach(tx1).unwrap();
        registry.attach(tx2).unwrap();
        assert!(matches!(registry.attach(tx3), Err(RegistryError::RoomFull)));
    }

    #[tokio::test]
    async fn unicast_delivers_only_to_the_named_seat() {
        let registry = Registry::new();
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        registry.attach(tx1).unwrap();
        registry.attach(tx2).unwrap();

        registry
            .unicast("player-1", ServerMessage::PlayerAssigned { player_id: "player-1".into() })
            .await
            .unwrap();

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_reaches_every_connected_seat() {
        let registry = Registry::new();
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        registry.attach(tx1).unwrap();
        registry.attach(tx2).unwrap();

        registry
            .broadcast(ServerMessage::PlayerAssigned { player_id: "player-1".into() })
            .await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn detach_marks_the_match_not_ready() {
        let registry = Registry::new();
        let (tx1, _rx1) = mpsc::channel(8);
        let (tx2, _rx2) = mpsc::channel(8);
        registry.attach(tx1).unwrap();
        registry.attach(tx2).unwrap();
        assert!(registry.is_ready());

        registry.detach("player-1");
        assert!(!registry.is_ready());
        assert_eq!(registry.seated_players(), vec!["player-1", "player-2"]);
    }

    #[test]
    fn a_seat_freed_while_waiting_is_reused_by_the_next_attach() {
        let registry = Registry::new();
        let (tx1, _rx1) = mpsc::channel(8);
        let (tx2, _rx2) = mpsc::channel(8);
        registry.attach(tx1).unwrap();
        registry.attach(tx2).unwrap();
        assert!(registry.is_ready());

        // player-2 disconnects before START_GAME; the seat must free up
        // rather than permanently occupying one of the two slots.
        registry.detach("player-2");
        assert!(!registry.is_ready());

        let (tx3, _rx3) = mpsc::channel(8);
        let reassigned = registry.attach(tx3).unwrap();
        assert_eq!(reassigned, "player-2");
        assert!(registry.is_ready());
        assert_eq!(registry.seated_players(), vec!["player-1", "player-2"]);
    }

    #[tokio::test]
    async fn unicast_to_a_detached_seat_is_reported() {
        let registry = Registry::new();
        let (tx1, _rx1) = mpsc::channel(8);
        registry.attach(tx1).unwrap();
        registry.detach("player-1");

        let err = registry
            .unicast("player-1", ServerMessage::PlayerAssigned { player_id: "player-1".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Disconnected(_)));
    }

    #[tokio::test]
    async fn unicast_to_an_unknown_player_is_reported() {
        let registry = Registry::new();
        let err = registry
            .unicast("player-9", ServerMessage::PlayerAssigned { player_id: "player-9".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownPlayer(_)));
    }

    #[tokio::test]
    async fn a_failed_unicast_detaches_the_seat_itself() {
        let registry = Registry::new();
        let (tx1, rx1) = mpsc::channel(8);
        registry.attach(tx1).unwrap();
        // Drop the receiving half so the send fails, as a dead peer would.
        drop(rx1);

        let err = registry
            .unicast("player-1", ServerMessage::PlayerAssigned { player_id: "player-1".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Disconnected(_)));

        // The registry must have marked the seat detached itself, without
        // waiting for a separate reader-loop teardown to call `detach`.
        let (tx2, _rx2) = mpsc::channel(8);
        assert_eq!(registry.attach(tx2).unwrap(), "player-1");
    }

    #[tokio::test]
    async fn a_failed_broadcast_send_detaches_that_seat_itself() {
        let registry = Registry::new();
        let (tx1, rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        registry.attach(tx1).unwrap();
        registry.attach(tx2).unwrap();
        drop(rx1);

        registry
            .broadcast(ServerMessage::PlayerAssigned { player_id: "player-1".into() })
            .await;

        assert!(rx2.try_recv().is_ok());
        // player-1's dead channel must have been detached as a side effect.
        let (tx3, _rx3) = mpsc::channel(8);
        assert_eq!(registry.attach(tx3).unwrap(), "player-1");
    }
}
