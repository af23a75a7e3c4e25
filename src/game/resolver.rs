//! Match Resolution
//!
//! Flip handling for the player holding the turn:
//!
//! ```text
//! AwaitingFirstFlip --flip--> AwaitingSecondFlip --flip--+--match----> AwaitingFirstFlip
//!                                                         |
//!                                                         +--mismatch-> Resolving
//!                                                                          |
//!                      AwaitingFirstFlip <--resolve_mismatch (after delay)-+
//! ```
//!
//! A match keeps the turn; a mismatch stays face-up until the scheduled
//! reset turns both cards back and passes the turn on.

use crate::game::board;
use crate::game::error::GameError;
use crate::game::events::{GameEvent, Outbound, RevealVariant};
use crate::game::player::ConnectionId;
use crate::game::session::{FlipOutcome, FlipState, MismatchTicket, Phase, Session};
use crate::game::turn;

impl Session {
    /// Flip the card at `position` on behalf of `actor`.
    ///
    /// Rejections leave the board untouched and produce no broadcast.
    pub fn flip(&mut self, actor: ConnectionId, position: usize) -> Result<FlipOutcome, GameError> {
        if self.phase != Phase::InProgress {
            return Err(GameError::GameNotStarted);
        }

        let player = self
            .player(&actor)
            .filter(|p| p.is_active)
            .ok_or(GameError::NotInSession)?;

        if matches!(self.flip_state, FlipState::Resolving { .. }) {
            return Err(GameError::ResolutionPending);
        }

        if !player.has_turn {
            return Err(GameError::NotYourTurn);
        }

        match self.board.get(position) {
            Some(card) if !card.is_flipped && !card.is_matched => {}
            _ => return Err(GameError::InvalidPosition(position)),
        }

        let actor_name = player.name.clone();
        let mut next_board = self.board.clone();
        next_board[position].is_flipped = true;

        let pending = board::pending_positions(&next_board);
        let [first, second] = match pending[..] {
            [a, b] => [a, b],
            _ => {
                self.board = next_board;
                self.flip_state = FlipState::AwaitingSecondFlip { first: position };
                return Ok(FlipOutcome {
                    events: vec![Outbound::broadcast(GameEvent::CardRevealed {
                        board: self.board.clone(),
                        message: format!("{} flipped a card", actor_name),
                        variant: RevealVariant::Info,
                    })],
                    pending: None,
                });
            }
        };

        if next_board[first].face == next_board[second].face {
            next_board[first].is_matched = true;
            next_board[second].is_matched = true;

            let mut roster = self.roster.clone();
            if let Some(p) = roster.iter_mut().find(|p| p.id == actor) {
                p.round_score += 1;
            }

            self.board = next_board;
            self.roster = roster;
            self.flip_state = FlipState::AwaitingFirstFlip;

            let mut events = vec![
                Outbound::broadcast(GameEvent::CardRevealed {
                    board: self.board.clone(),
                    message: format!("{} found a pair!", actor_name),
                    variant: RevealVariant::Success,
                }),
                self.roster_event(),
            ];

            if board::is_cleared(&self.board) {
                events.extend(self.complete_round()?);
            }

            return Ok(FlipOutcome { events, pending: None });
        }

        self.board = next_board;
        self.flip_state = FlipState::Resolving { first, second, actor };

        Ok(FlipOutcome {
            events: vec![Outbound::broadcast(GameEvent::CardRevealed {
                board: self.board.clone(),
                message: format!("{} missed", actor_name),
                variant: RevealVariant::Error,
            })],
            pending: Some(MismatchTicket {
                generation: self.generation,
                first,
                second,
                actor,
            }),
        })
    }

    /// Turn a mismatched pair back and pass the turn.
    ///
    /// A ticket from an earlier generation, or for a pair that is no longer
    /// being resolved, does nothing. The turn only moves if the flipping
    /// player still holds it.
    pub fn resolve_mismatch(&mut self, ticket: MismatchTicket) -> Vec<Outbound> {
        if !self.ticket_is_current(&ticket) {
            return Vec::new();
        }

        self.hide_pending_cards();

        let holds_turn = self.player(&ticket.actor).is_some_and(|p| p.has_turn);
        if holds_turn {
            // A stalled rotation means the roster is already being torn down
            // by the departure that caused it.
            if let Ok(next) = turn::advance(&self.roster, ticket.actor) {
                self.roster = next;
            }
        }

        vec![
            Outbound::broadcast(GameEvent::BoardUpdated { board: self.board.clone() }),
            self.roster_event(),
        ]
    }
}
