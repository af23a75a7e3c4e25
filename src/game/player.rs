//! Player Definitions
//!
//! Roster entries and the per-connection handle they are keyed by.

use serde::{Serialize, Deserialize};

// =============================================================================
// CONNECTION ID
// =============================================================================

/// Opaque per-connection handle (UUID as bytes).
///
/// Changes every time a participant reconnects; the stable key is what
/// links a new connection back to an existing roster slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub [u8; 16]);

impl ConnectionId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Allocate a fresh random handle.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().into_bytes())
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s)
            .ok()
            .map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Short hex prefix for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

// =============================================================================
// PLAYER
// =============================================================================

/// A participant in the roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Current connection handle
    pub id: ConnectionId,

    /// Caller-supplied network address, survives reconnects
    pub stable_key: String,

    /// Display name (not unique)
    pub name: String,

    /// Pairs matched in the current round
    pub round_score: u32,

    /// Rounds won (or tied) in the current session
    pub session_score: u32,

    /// Holds the turn
    pub has_turn: bool,

    /// Coordinating player
    pub is_host: bool,

    /// Connected; inactive players keep their slot for reconnection
    pub is_active: bool,
}

impl Player {
    /// Create a freshly joined, active player with zero scores.
    pub fn new(id: ConnectionId, stable_key: impl Into<String>, name: impl Into<String>, is_host: bool) -> Self {
        Self {
            id,
            stable_key: stable_key.into(),
            name: name.into(),
            round_score: 0,
            session_score: 0,
            has_turn: false,
            is_host,
            is_active: true,
        }
    }
}

/// Number of active players in a roster.
pub fn active_count(roster: &[Player]) -> usize {
    roster.iter().filter(|p| p.is_active).count()
}

/// Index of the player holding the turn, if any.
pub fn turn_holder(roster: &[Player]) -> Option<usize> {
    roster.iter().position(|p| p.has_turn)
}
