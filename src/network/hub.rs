//! Session Hub
//!
//! Owns the one live [`Session`] and the set of open connections. Every
//! intent is applied under the hub lock and its events are delivered
//! before the lock is released, so all connections observe transitions
//! in the same order.

use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::game::events::{Delivery, GameEvent, Outbound};
use crate::game::player::ConnectionId;
use crate::game::session::{MismatchTicket, Phase, Session, SessionConfig};
use crate::network::protocol::{ClientMessage, ServerMessage};

/// Hub shared between connection tasks and timers.
pub type SharedHub = Arc<Mutex<SessionHub>>;

/// An open connection.
struct ClientConnection {
    /// Peer address; its IP is the player's stable key.
    addr: SocketAddr,
    /// Outbound queue for this connection.
    sender: mpsc::Sender<ServerMessage>,
    /// Connection time.
    connected_at: Instant,
    /// Fired when the hub drops the connection.
    evict: Option<oneshot::Sender<()>>,
}

/// A scheduled mismatch reset.
struct PendingReset {
    ticket: MismatchTicket,
    task: JoinHandle<()>,
}

/// The session plus everyone connected to it.
pub struct SessionHub {
    /// Game state.
    session: Session,
    /// Open connections.
    connections: BTreeMap<ConnectionId, ClientConnection>,
    /// Reset timer for a face-up mismatched pair.
    pending_reset: Option<PendingReset>,
}

impl SessionHub {
    /// Create a hub around an empty session.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            session: Session::new(config),
            connections: BTreeMap::new(),
            pending_reset: None,
        }
    }

    /// Wrap a hub for sharing.
    pub fn shared(config: SessionConfig) -> SharedHub {
        Arc::new(Mutex::new(Self::new(config)))
    }

    /// Current session state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Whether a mismatch reset is scheduled.
    pub fn has_pending_reset(&self) -> bool {
        self.pending_reset.is_some()
    }

    /// Register a new connection.
    ///
    /// The returned receiver resolves if the hub gives up on the
    /// connection because its queue stopped draining.
    pub fn connect(
        &mut self,
        id: ConnectionId,
        addr: SocketAddr,
        sender: mpsc::Sender<ServerMessage>,
    ) -> oneshot::Receiver<()> {
        let (evict_tx, evict_rx) = oneshot::channel();
        self.connections.insert(id, ClientConnection {
            addr,
            sender,
            connected_at: Instant::now(),
            evict: Some(evict_tx),
        });
        debug!("Connection {} registered from {}", id.short(), addr);
        evict_rx
    }

    /// Apply one client message.
    pub async fn handle_message(hub: &SharedHub, id: ConnectionId, msg: ClientMessage) {
        let mut guard = hub.lock().await;

        match msg {
            ClientMessage::Join(req) => {
                let Some(stable_key) = guard.stable_key(&id) else {
                    return;
                };
                let was_running = guard.session.phase() == Phase::InProgress;
                match guard.session.join(id, &stable_key, &req.display_name) {
                    Ok(events) => {
                        if was_running {
                            info!("Player {} rejoined from {}", id.short(), stable_key);
                        } else {
                            info!("Player {} joined as {:?}", id.short(), req.display_name);
                        }
                        guard.dispatch(events);
                    }
                    Err(e) => {
                        debug!("Join from {} rejected: {}", id.short(), e);
                        guard.send_to(&id, ServerMessage::join_failed(&e));
                    }
                }
            }
            ClientMessage::StartGame(req) => {
                match guard.session.start_game(id, req.pair_count, req.max_rounds) {
                    Ok(events) => {
                        info!(
                            "Game started by {} with {} players, {} pairs, {} rounds",
                            id.short(),
                            guard.session.roster().len(),
                            guard.session.pair_count(),
                            guard.session.max_rounds(),
                        );
                        guard.dispatch(events);
                    }
                    Err(e) => {
                        debug!("Start from {} rejected: {}", id.short(), e);
                        guard.send_to(&id, ServerMessage::error(&e));
                    }
                }
            }
            ClientMessage::Flip { position } => {
                match guard.session.flip(id, position) {
                    Ok(outcome) => {
                        for outbound in &outcome.events {
                            match &outbound.event {
                                GameEvent::RoundWon { player } => {
                                    info!("Round won by {} ({})", player.id.short(), player.name);
                                }
                                GameEvent::RoundTied { players } => {
                                    info!("Round tied between {} players", players.len());
                                }
                                GameEvent::SessionFinished => {
                                    info!("Session finished, back to lobby");
                                }
                                _ => {}
                            }
                        }
                        guard.dispatch(outcome.events);
                        if let Some(ticket) = outcome.pending {
                            guard.schedule_reset(hub.clone(), ticket);
                        }
                    }
                    Err(e) => {
                        debug!("Flip {} from {} rejected: {}", position, id.short(), e);
                        guard.send_to(&id, ServerMessage::error(&e));
                    }
                }
            }
            ClientMessage::Leave => {
                guard.leave(id);
            }
            ClientMessage::Ping { timestamp } => {
                let pong = ServerMessage::Pong {
                    timestamp,
                    server_time: chrono::Utc::now().timestamp_millis(),
                };
                guard.send_to(&id, pong);
            }
        }

        guard.cancel_stale_reset();
    }

    /// Drop a closed connection; counts as leaving the game.
    pub async fn disconnect(hub: &SharedHub, id: ConnectionId) {
        let mut guard = hub.lock().await;
        if let Some(conn) = guard.connections.remove(&id) {
            debug!(
                "Connection {} from {} closed after {:?}",
                id.short(),
                conn.addr,
                conn.connected_at.elapsed(),
            );
        }
        guard.leave(id);
        guard.cancel_stale_reset();
    }

    fn leave(&mut self, id: ConnectionId) {
        let generation = self.session.generation();
        let events = self.session.leave(id);
        if events.is_empty() {
            return;
        }

        if self.session.generation() != generation {
            warn!("Too few active players after {} left, session stopped", id.short());
        } else {
            info!("Player {} left", id.short());
        }
        self.dispatch(events);
    }

    /// Stable key for a connection: its peer IP.
    fn stable_key(&self, id: &ConnectionId) -> Option<String> {
        self.connections.get(id).map(|c| c.addr.ip().to_string())
    }

    /// Turn the mismatched pair back after the reveal delay.
    fn schedule_reset(&mut self, hub: SharedHub, ticket: MismatchTicket) {
        if let Some(previous) = self.pending_reset.take() {
            previous.task.abort();
        }

        let delay = self.session.config().reveal_delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut guard = hub.lock().await;
            guard.fire_reset(ticket);
        });

        self.pending_reset = Some(PendingReset { ticket, task });
    }

    fn fire_reset(&mut self, ticket: MismatchTicket) {
        if self.pending_reset.as_ref().is_some_and(|p| p.ticket == ticket) {
            self.pending_reset = None;
        }

        let events = self.session.resolve_mismatch(ticket);
        if events.is_empty() {
            debug!("Stale mismatch reset for generation {} ignored", ticket.generation);
            return;
        }
        self.dispatch(events);
    }

    /// Abort a scheduled reset that no longer matches the session.
    fn cancel_stale_reset(&mut self) {
        let stale = self
            .pending_reset
            .as_ref()
            .is_some_and(|p| !self.session.ticket_is_current(&p.ticket));
        if stale {
            if let Some(pending) = self.pending_reset.take() {
                pending.task.abort();
                debug!("Cancelled mismatch reset for generation {}", pending.ticket.generation);
            }
        }
    }

    /// Deliver events in order.
    ///
    /// Delivery never waits for queue space. A connection whose queue is
    /// full or closed is dropped and leaves the game; the events caused by
    /// that departure are delivered in turn.
    fn dispatch(&mut self, events: Vec<Outbound>) {
        let mut pending = events;

        while !pending.is_empty() {
            let mut stalled = BTreeSet::new();

            for outbound in pending {
                let message = ServerMessage::from(&outbound.event);

                #[cfg(feature = "debug-tracing")]
                debug!("dispatch {} -> {:?}: {:?}", outbound.kind(), outbound.delivery, message.to_json());

                match outbound.delivery {
                    Delivery::Broadcast => {
                        for (id, conn) in &self.connections {
                            if !stalled.contains(id) && conn.sender.try_send(message.clone()).is_err() {
                                stalled.insert(*id);
                            }
                        }
                    }
                    Delivery::Direct(to) => {
                        if let Some(conn) = self.connections.get(&to) {
                            if !stalled.contains(&to) && conn.sender.try_send(message).is_err() {
                                stalled.insert(to);
                            }
                        }
                    }
                }
            }

            pending = Vec::new();
            for id in stalled {
                pending.extend(self.evict(id));
            }
        }
    }

    /// Send to one connection.
    fn send_to(&mut self, id: &ConnectionId, message: ServerMessage) {
        let Some(conn) = self.connections.get(id) else {
            return;
        };
        if conn.sender.try_send(message).is_err() {
            let events = self.evict(*id);
            self.dispatch(events);
        }
    }

    /// Drop a connection that stopped draining its queue.
    fn evict(&mut self, id: ConnectionId) -> Vec<Outbound> {
        if let Some(mut conn) = self.connections.remove(&id) {
            warn!("Connection {} from {} is not keeping up, dropping it", id.short(), conn.addr);
            if let Some(evict) = conn.evict.take() {
                let _ = evict.send(());
            }
        }
        self.session.leave(id)
    }
}
