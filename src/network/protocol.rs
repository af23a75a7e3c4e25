//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are JSON text frames.

use serde::{Serialize, Deserialize};

use crate::game::board::Card;
use crate::game::error::GameError;
use crate::game::events::{GameEvent, RevealVariant};
use crate::game::player::Player;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join the lobby, or rejoin a running game.
    Join(JoinRequest),

    /// Start a game with the current roster.
    StartGame(StartGameRequest),

    /// Flip a card.
    Flip { position: usize },

    /// Leave the session (also implied by closing the socket).
    Leave,

    /// Ping for latency measurement.
    Ping { timestamp: u64 },
}

/// Join request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Name shown to other players.
    pub display_name: String,
}

/// Start request; omitted fields use server defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartGameRequest {
    /// Pairs on the board.
    #[serde(default)]
    pub pair_count: Option<usize>,
    /// Rounds in the session.
    #[serde(default)]
    pub max_rounds: Option<u32>,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Outcome of a join request (sent only to the requester).
    JoinResult(JoinResultInfo),

    /// Full roster snapshot.
    Roster { players: Vec<PlayerView> },

    /// New board at round start.
    BoardStarted { board: Vec<CardView> },

    /// Board after a flip.
    CardRevealed {
        board: Vec<CardView>,
        message: String,
        variant: RevealVariant,
    },

    /// Board after face-up cards were turned back.
    BoardUpdated { board: Vec<CardView> },

    /// Round tied between these players.
    RoundTied { players: Vec<PlayerView> },

    /// Round won by this player.
    RoundWon { player: PlayerView },

    /// Next round started.
    RoundAdvanced { round_index: u32, max_rounds: u32 },

    /// All rounds played.
    SessionFinished,

    /// Session stopped for lack of players.
    SessionStopped,

    /// Request rejected.
    Error(ServerError),

    /// Pong response.
    Pong { timestamp: u64, server_time: i64 },

    /// Server is shutting down.
    Shutdown { reason: String },
}

/// Join outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResultInfo {
    /// Whether the join succeeded.
    pub success: bool,
    /// Human-readable result.
    pub message: String,
    /// Reclaimed an existing slot.
    pub rejoined: bool,
}

/// Player as seen by clients. The stable key (peer address) is not sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    /// Connection handle (UUID string).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Pairs this round.
    pub round_score: u32,
    /// Rounds won this session.
    pub session_score: u32,
    /// Holds the turn.
    pub has_turn: bool,
    /// Host.
    pub is_host: bool,
    /// Connected.
    pub is_active: bool,
}

impl From<&Player> for PlayerView {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id.to_uuid_string(),
            name: p.name.clone(),
            round_score: p.round_score,
            session_score: p.session_score,
            has_turn: p.has_turn,
            is_host: p.is_host,
            is_active: p.is_active,
        }
    }
}

/// Card as seen by clients. Face-down cards carry no face.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardView {
    /// Board slot.
    pub position: usize,
    /// Symbol, only when face-up.
    pub face: Option<String>,
    /// Face-up.
    pub is_flipped: bool,
    /// Resolved.
    pub is_matched: bool,
}

impl From<&Card> for CardView {
    fn from(c: &Card) -> Self {
        let visible = c.is_flipped || c.is_matched;
        Self {
            position: c.position,
            face: visible.then(|| c.symbol().to_string()),
            is_flipped: c.is_flipped,
            is_matched: c.is_matched,
        }
    }
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed message.
    InvalidInput,
    /// Pair count or round count out of range.
    InvalidConfiguration,
    /// Game already running.
    GameInProgress,
    /// Fewer than two players.
    NotEnoughPlayers,
    /// Card cannot be flipped.
    InvalidPosition,
    /// Roster full.
    SessionFull,
    /// Connection already joined.
    AlreadyJoined,
    /// Connection not in roster.
    NotInSession,
    /// No game running.
    GameNotStarted,
    /// Someone else's turn.
    NotYourTurn,
    /// Mismatched pair still showing.
    ResolutionPending,
    /// Internal error.
    InternalError,
}

impl From<&GameError> for ErrorCode {
    fn from(e: &GameError) -> Self {
        match e {
            GameError::InvalidConfiguration(_) => ErrorCode::InvalidConfiguration,
            GameError::GameInProgress => ErrorCode::GameInProgress,
            GameError::NotEnoughPlayers => ErrorCode::NotEnoughPlayers,
            GameError::InvalidPosition(_) => ErrorCode::InvalidPosition,
            GameError::SessionFull => ErrorCode::SessionFull,
            GameError::AlreadyJoined => ErrorCode::AlreadyJoined,
            GameError::NotInSession => ErrorCode::NotInSession,
            GameError::GameNotStarted => ErrorCode::GameNotStarted,
            GameError::NotYourTurn => ErrorCode::NotYourTurn,
            GameError::ResolutionPending => ErrorCode::ResolutionPending,
            // Never leaves the core in practice
            GameError::NoEligibleNextPlayer => ErrorCode::InternalError,
        }
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

fn board_view(board: &[Card]) -> Vec<CardView> {
    board.iter().map(CardView::from).collect()
}

fn roster_view(players: &[Player]) -> Vec<PlayerView> {
    players.iter().map(PlayerView::from).collect()
}

impl From<&GameEvent> for ServerMessage {
    fn from(event: &GameEvent) -> Self {
        match event {
            GameEvent::JoinResult { success, message, rejoined } => {
                ServerMessage::JoinResult(JoinResultInfo {
                    success: *success,
                    message: message.clone(),
                    rejoined: *rejoined,
                })
            }
            GameEvent::Roster { players } => ServerMessage::Roster { players: roster_view(players) },
            GameEvent::BoardStarted { board } => ServerMessage::BoardStarted { board: board_view(board) },
            GameEvent::CardRevealed { board, message, variant } => ServerMessage::CardRevealed {
                board: board_view(board),
                message: message.clone(),
                variant: *variant,
            },
            GameEvent::BoardUpdated { board } => ServerMessage::BoardUpdated { board: board_view(board) },
            GameEvent::RoundTied { players } => ServerMessage::RoundTied { players: roster_view(players) },
            GameEvent::RoundWon { player } => ServerMessage::RoundWon { player: PlayerView::from(player) },
            GameEvent::RoundAdvanced { round_index, max_rounds } => ServerMessage::RoundAdvanced {
                round_index: *round_index,
                max_rounds: *max_rounds,
            },
            GameEvent::SessionFinished => ServerMessage::SessionFinished,
            GameEvent::SessionStopped => ServerMessage::SessionStopped,
        }
    }
}

impl ServerMessage {
    /// Rejection for a failed intent.
    pub fn error(e: &GameError) -> Self {
        ServerMessage::Error(ServerError {
            code: ErrorCode::from(e),
            message: e.to_string(),
        })
    }

    /// Failed join, reported through the join channel.
    pub fn join_failed(e: &GameError) -> Self {
        ServerMessage::JoinResult(JoinResultInfo {
            success: false,
            message: e.to_string(),
            rejoined: false,
        })
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
