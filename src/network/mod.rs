//! Network Layer
//!
//! WebSocket server for real-time multiplayer communication.
//! This layer is **non-deterministic** - all game rules run through `game/`.

pub mod hub;
pub mod protocol;
pub mod server;

pub use hub::{SessionHub, SharedHub};
pub use protocol::{
    CardView, ClientMessage, ErrorCode, PlayerView, ServerError, ServerMessage,
};
pub use server::{GameServer, ServerConfig, GameServerError};
