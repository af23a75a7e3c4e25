//! Session State
//!
//! The single mutable source of truth for a game: roster, board, phase
//! and round counter. Transitions live next to the component that owns
//! them (`roster`, `resolver`, `lifecycle`); this module holds the shared
//! state, configuration and reset logic.

use std::time::Duration;

use crate::core::rng::{derive_round_seed, entropy_seed, seed_from_digest, SessionRng};
use crate::game::board::{self, Board};
use crate::game::error::GameError;
use crate::game::events::Outbound;
use crate::game::player::{ConnectionId, Player};

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Lobby: players may join, nobody may flip.
    WaitingForPlayers,
    /// Rounds are being played.
    InProgress,
}

/// Where the current pair stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipState {
    /// No unresolved card is face-up.
    AwaitingFirstFlip,
    /// One card of the pair is face-up.
    AwaitingSecondFlip {
        /// Position of the face-up card.
        first: usize,
    },
    /// A mismatched pair is face-up, waiting to be turned back.
    Resolving {
        /// First card of the pair.
        first: usize,
        /// Second card of the pair.
        second: usize,
        /// Player who flipped them.
        actor: ConnectionId,
    },
}

/// Configuration for the session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum players in the roster.
    pub max_players: usize,
    /// Pairs per board when a start request does not specify one.
    pub default_pair_count: usize,
    /// Rounds per session when a start request does not specify one.
    pub default_max_rounds: u32,
    /// How long a mismatched pair stays face-up.
    pub reveal_delay: Duration,
    /// Fixed base seed; fresh entropy when unset.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_players: 8,
            default_pair_count: 8,
            default_max_rounds: 3,
            reveal_delay: Duration::from_millis(1500),
            seed: None,
        }
    }
}

/// Handle for a scheduled mismatch reset.
///
/// Only honoured while the session is still on the same generation and
/// still resolving the same pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MismatchTicket {
    /// Session generation at scheduling time.
    pub generation: u64,
    /// First card of the pair.
    pub first: usize,
    /// Second card of the pair.
    pub second: usize,
    /// Player who flipped the pair.
    pub actor: ConnectionId,
}

/// Result of a successful flip.
#[derive(Debug, Clone, Default)]
pub struct FlipOutcome {
    /// Events to deliver now.
    pub events: Vec<Outbound>,
    /// Reset to run after the reveal delay (mismatch only).
    pub pending: Option<MismatchTicket>,
}

/// A game session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session configuration.
    pub(crate) config: SessionConfig,
    /// Players in join order.
    pub(crate) roster: Vec<Player>,
    /// Current board (empty outside a game).
    pub(crate) board: Board,
    /// Current phase.
    pub(crate) phase: Phase,
    /// Current pair progress.
    pub(crate) flip_state: FlipState,
    /// 1-based round counter.
    pub(crate) round_index: u32,
    /// Rounds in this session.
    pub(crate) max_rounds: u32,
    /// Pairs per board in this session.
    pub(crate) pair_count: usize,
    /// Bumped on every full reset; invalidates pending tickets.
    pub(crate) generation: u64,
    /// Base entropy for board seeds.
    pub(crate) base_seed: u64,
    /// Turn selection randomness.
    pub(crate) rng: SessionRng,
}

impl Session {
    /// Create an empty session.
    pub fn new(config: SessionConfig) -> Self {
        let base_seed = config.seed.unwrap_or_else(entropy_seed);
        Self {
            max_rounds: config.default_max_rounds,
            pair_count: config.default_pair_count,
            config,
            roster: Vec::new(),
            board: Vec::new(),
            phase: Phase::WaitingForPlayers,
            flip_state: FlipState::AwaitingFirstFlip,
            round_index: 1,
            generation: 0,
            base_seed,
            rng: SessionRng::new(base_seed),
        }
    }

    /// Players in join order.
    pub fn roster(&self) -> &[Player] {
        &self.roster
    }

    /// Current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current pair progress.
    pub fn flip_state(&self) -> FlipState {
        self.flip_state
    }

    /// 1-based round counter.
    pub fn round_index(&self) -> u32 {
        self.round_index
    }

    /// Rounds in this session.
    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Pairs per board in this session.
    pub fn pair_count(&self) -> usize {
        self.pair_count
    }

    /// Reset counter.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Look up a player by connection.
    pub fn player(&self, id: &ConnectionId) -> Option<&Player> {
        self.roster.iter().find(|p| p.id == *id)
    }

    /// Whether a scheduled reset still applies to the current state.
    pub fn ticket_is_current(&self, ticket: &MismatchTicket) -> bool {
        ticket.generation == self.generation
            && self.flip_state
                == FlipState::Resolving {
                    first: ticket.first,
                    second: ticket.second,
                    actor: ticket.actor,
                }
    }

    /// Board for `round_index`, seeded from the session entropy.
    pub(crate) fn deal_board(&self, round_index: u32) -> Result<Board, GameError> {
        let digest = derive_round_seed(self.base_seed, self.generation, round_index);
        let mut rng = SessionRng::new(seed_from_digest(&digest));
        board::generate(self.pair_count, &mut rng)
    }

    /// Return to an empty lobby: roster and board cleared, counters reset.
    pub(crate) fn reset(&mut self) {
        self.roster = Vec::new();
        self.clear_game();
    }

    /// Drop game state, keep the roster.
    pub(crate) fn clear_game(&mut self) {
        self.board = Vec::new();
        self.phase = Phase::WaitingForPlayers;
        self.flip_state = FlipState::AwaitingFirstFlip;
        self.round_index = 1;
        self.max_rounds = self.config.default_max_rounds;
        self.pair_count = self.config.default_pair_count;
        self.generation += 1;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::fixtures::*;

    #[test]
    fn test_new_session_is_empty_lobby() {
        let session = Session::default();
        assert!(session.roster().is_empty());
        assert!(session.board().is_empty());
        assert_eq!(session.phase(), Phase::WaitingForPlayers);
        assert_eq!(session.round_index(), 1);
        assert_eq!(session.flip_state(), FlipState::AwaitingFirstFlip);
    }

    #[test]
    fn test_reset_bumps_generation() {
        let mut session = started(2, 4, 2);
        let before = session.generation();

        session.reset();
        assert_eq!(session.generation(), before + 1);
        assert!(session.roster().is_empty());
        assert!(session.board().is_empty());
        assert_eq!(session.phase(), Phase::WaitingForPlayers);
    }

    #[test]
    fn test_deal_board_reproducible() {
        let session = lobby(2);
        let a = session.deal_board(1).unwrap();
        let b = session.deal_board(1).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), session.pair_count() * 2);
    }

    #[test]
    fn test_ticket_is_current() {
        let session = started(2, 4, 1);
        let ticket = MismatchTicket {
            generation: session.generation(),
            first: 0,
            second: 1,
            actor: conn(1),
        };
        // Nothing is resolving yet
        assert!(!session.ticket_is_current(&ticket));
    }
}
