//! Game Logic Module
//!
//! The session core: synchronous, transport-free, and fully driven by
//! explicit calls on a [`Session`](session::Session).
//!
//! ## Module Structure
//!
//! - `board`: Board generation and card queries
//! - `player`: Roster entries and connection handles
//! - `turn`: Turn rotation
//! - `roster`: Join, leave and reconnection
//! - `resolver`: Flip handling and mismatch reset
//! - `lifecycle`: Game start, round scoring, session end
//! - `session`: Shared state, configuration, resets
//! - `events`: Outbound notifications
//! - `error`: Rejection reasons

pub mod board;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod player;
pub mod resolver;
pub mod roster;
pub mod session;
pub mod turn;

// Re-export key types
pub use board::{Board, Card, SYMBOL_POOL};
pub use error::GameError;
pub use events::{Delivery, GameEvent, Outbound, RevealVariant};
pub use lifecycle::{decide_round, RoundOutcome};
pub use player::{ConnectionId, Player};
pub use session::{FlipOutcome, FlipState, MismatchTicket, Phase, Session, SessionConfig};
