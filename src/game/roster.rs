//! Roster Management
//!
//! Join, leave and reconnection. Players are kept in join order; leaving
//! mid-game only deactivates a slot so the same stable key can reclaim it.

use crate::game::board;
use crate::game::error::GameError;
use crate::game::events::{GameEvent, Outbound};
use crate::game::player::{active_count, ConnectionId, Player};
use crate::game::session::{FlipState, Phase, Session};
use crate::game::turn;

impl Session {
    /// Add a player, or reclaim an inactive slot while a game is running.
    ///
    /// In the lobby a new player is appended (host if first). During a game
    /// only an inactive slot may be reclaimed: first one still bound to this
    /// connection (it left explicitly), then one with the same `stable_key`.
    /// Everyone else gets [`GameError::GameInProgress`].
    pub fn join(
        &mut self,
        id: ConnectionId,
        stable_key: &str,
        name: &str,
    ) -> Result<Vec<Outbound>, GameError> {
        if self.player(&id).is_some_and(|p| p.is_active) {
            return Err(GameError::AlreadyJoined);
        }

        match self.phase {
            Phase::WaitingForPlayers => {
                if self.roster.len() >= self.config.max_players {
                    return Err(GameError::SessionFull);
                }

                let name = display_name(name, self.roster.len());
                let mut roster = self.roster.clone();
                roster.push(Player::new(id, stable_key, name, roster.is_empty()));
                self.roster = roster;

                Ok(vec![
                    Outbound::direct(id, GameEvent::JoinResult {
                        success: true,
                        message: "Joined the game".to_string(),
                        rejoined: false,
                    }),
                    self.roster_event(),
                ])
            }
            Phase::InProgress => {
                let slot = self
                    .roster
                    .iter()
                    .position(|p| !p.is_active && p.id == id)
                    .or_else(|| {
                        self.roster
                            .iter()
                            .position(|p| !p.is_active && p.stable_key == stable_key)
                    })
                    .ok_or(GameError::GameInProgress)?;

                let mut roster = self.roster.clone();
                let player = &mut roster[slot];
                player.id = id;
                player.is_active = true;
                if !name.trim().is_empty() {
                    player.name = name.trim().to_string();
                }
                self.roster = roster;

                Ok(vec![
                    Outbound::direct(id, GameEvent::JoinResult {
                        success: true,
                        message: "Rejoined the game".to_string(),
                        rejoined: true,
                    }),
                    Outbound::direct(id, GameEvent::BoardStarted { board: self.board.clone() }),
                    Outbound::direct(id, GameEvent::RoundAdvanced {
                        round_index: self.round_index,
                        max_rounds: self.max_rounds,
                    }),
                    self.roster_event(),
                ])
            }
        }
    }

    /// Handle a departure (explicit or connection loss).
    ///
    /// Unknown or already inactive connections are ignored. In the lobby the
    /// slot is removed.
    /// During a game the slot is deactivated; if fewer than two active
    /// players remain the whole session resets.
    pub fn leave(&mut self, id: ConnectionId) -> Vec<Outbound> {
        let Some(slot) = self.roster.iter().position(|p| p.id == id && p.is_active) else {
            return Vec::new();
        };

        match self.phase {
            Phase::WaitingForPlayers => {
                let mut roster = self.roster.clone();
                let departed = roster.remove(slot);
                if departed.is_host {
                    if let Some(first) = roster.first_mut() {
                        first.is_host = true;
                    }
                }
                self.roster = roster;
                vec![self.roster_event()]
            }
            Phase::InProgress => {
                let mut roster = self.roster.clone();
                roster[slot].is_active = false;

                if active_count(&roster) < 2 {
                    return self.stop();
                }

                let mut events = Vec::new();
                let departed = roster[slot].clone();

                if departed.has_turn {
                    if self.hide_pending_cards() {
                        events.push(Outbound::broadcast(GameEvent::BoardUpdated {
                            board: self.board.clone(),
                        }));
                    }
                    roster = match turn::advance(&roster, id) {
                        Ok(next) => next,
                        Err(_) => return self.stop(),
                    };
                }

                if departed.is_host {
                    roster[slot].is_host = false;
                    if let Some(next_host) = roster.iter_mut().find(|p| p.is_active) {
                        next_host.is_host = true;
                    }
                }

                self.roster = roster;
                events.push(self.roster_event());
                events
            }
        }
    }

    /// Tear the session down after too many departures.
    fn stop(&mut self) -> Vec<Outbound> {
        self.reset();
        vec![Outbound::broadcast(GameEvent::SessionStopped)]
    }

    /// Turn back any face-up unresolved cards and drop the current pair.
    ///
    /// Returns whether the board changed.
    pub(crate) fn hide_pending_cards(&mut self) -> bool {
        let pending = board::pending_positions(&self.board);
        self.flip_state = FlipState::AwaitingFirstFlip;
        if pending.is_empty() {
            return false;
        }

        self.board = self
            .board
            .iter()
            .map(|c| {
                let mut c = *c;
                if c.is_pending() {
                    c.is_flipped = false;
                }
                c
            })
            .collect();
        true
    }

    /// Roster snapshot for every connection.
    pub(crate) fn roster_event(&self) -> Outbound {
        Outbound::broadcast(GameEvent::Roster { players: self.roster.clone() })
    }
}

/// Trimmed display name, or a numbered placeholder when blank.
fn display_name(name: &str, seat: usize) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        format!("Player {}", seat + 1)
    } else {
        trimmed.to_string()
    }
}
