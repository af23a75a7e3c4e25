//! # Memory Match Server
//!
//! Authoritative server for a shared, turn-based memory matching game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   MEMORY MATCH SERVER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Primitives                               │
//! │  └── rng.rs       - Seeded Xorshift128+ PRNG, round seeds    │
//! │                                                              │
//! │  game/            - Session core (synchronous)               │
//! │  ├── board.rs     - Board generation                         │
//! │  ├── player.rs    - Roster entries, connection handles       │
//! │  ├── turn.rs      - Turn rotation                            │
//! │  ├── roster.rs    - Join, leave, reconnection                │
//! │  ├── resolver.rs  - Flips, matches, mismatch reset           │
//! │  ├── lifecycle.rs - Start, round scoring, session end        │
//! │  ├── session.rs   - Shared state and configuration           │
//! │  └── events.rs    - Outbound notifications                   │
//! │                                                              │
//! │  network/         - Transport (async)                        │
//! │  ├── server.rs    - WebSocket server                         │
//! │  ├── hub.rs       - Session ownership, timers, fan-out       │
//! │  └── protocol.rs  - Wire messages                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Session Core
//!
//! `core/` and `game/` never touch the clock, the network or a logger:
//! - Every operation returns the events it produced
//! - Timed work comes back as a [`MismatchTicket`] for the caller to schedule
//! - All randomness comes from a seeded [`SessionRng`]
//!
//! With a fixed seed the same sequence of intents always yields the
//! same boards, turn order and events.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::rng::SessionRng;
pub use game::{
    Card, ConnectionId, GameError, GameEvent, MismatchTicket, Outbound, Phase, Player, Session,
    SessionConfig,
};
pub use network::{GameServer, GameServerError, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
