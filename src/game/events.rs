//! Session Events
//!
//! Outbound notifications produced by session transitions. The core only
//! decides *what* is said and *to whom*; the network layer delivers them.

use serde::{Serialize, Deserialize};

use crate::game::board::Board;
use crate::game::player::{ConnectionId, Player};

/// Tone of a card reveal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealVariant {
    /// Pair matched
    Success,
    /// Pair mismatched
    Error,
    /// First card of a pair
    Info,
}

/// Event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Outcome of a join request
    JoinResult {
        success: bool,
        message: String,
        rejoined: bool,
    },

    /// Full roster snapshot
    Roster { players: Vec<Player> },

    /// Fresh board at round start
    BoardStarted { board: Board },

    /// Board after a flip
    CardRevealed {
        board: Board,
        message: String,
        variant: RevealVariant,
    },

    /// Board after face-up cards were turned back
    BoardUpdated { board: Board },

    /// Round ended with several top scorers
    RoundTied { players: Vec<Player> },

    /// Round ended with a single top scorer
    RoundWon { player: Player },

    /// Next round begins
    RoundAdvanced { round_index: u32, max_rounds: u32 },

    /// Final round played
    SessionFinished,

    /// Too few active players remained
    SessionStopped,
}

/// Who receives an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Every connection
    Broadcast,
    /// A single connection
    Direct(ConnectionId),
}

/// An event paired with its audience.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outbound {
    /// Audience
    pub delivery: Delivery,
    /// Payload
    pub event: GameEvent,
}

impl Outbound {
    /// Event for every connection.
    pub fn broadcast(event: GameEvent) -> Self {
        Self { delivery: Delivery::Broadcast, event }
    }

    /// Event for one connection only.
    pub fn direct(to: ConnectionId, event: GameEvent) -> Self {
        Self { delivery: Delivery::Direct(to), event }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match &self.event {
            GameEvent::JoinResult { .. } => "join_result",
            GameEvent::Roster { .. } => "roster",
            GameEvent::BoardStarted { .. } => "board_started",
            GameEvent::CardRevealed { .. } => "card_revealed",
            GameEvent::BoardUpdated { .. } => "board_updated",
            GameEvent::RoundTied { .. } => "round_tied",
            GameEvent::RoundWon { .. } => "round_won",
            GameEvent::RoundAdvanced { .. } => "round_advanced",
            GameEvent::SessionFinished => "session_finished",
            GameEvent::SessionStopped => "session_stopped",
        }
    }
}
