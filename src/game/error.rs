//! Session errors.
//!
//! Every rejected intent leaves the session exactly as it was.

/// Errors produced by session transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// Board or round configuration out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Join attempted by an unknown participant while a game is running.
    #[error("Game already in progress")]
    GameInProgress,

    /// Start requested with fewer than two players in the roster.
    #[error("Not enough players to start")]
    NotEnoughPlayers,

    /// Flip on an out-of-range, face-up or already matched card.
    #[error("Invalid card position: {0}")]
    InvalidPosition(usize),

    /// Turn rotation found nobody else to hand the turn to.
    #[error("No eligible next player")]
    NoEligibleNextPlayer,

    /// Roster already holds the configured maximum.
    #[error("Session is full")]
    SessionFull,

    /// This connection is already in the roster.
    #[error("Already joined")]
    AlreadyJoined,

    /// Connection is not part of the roster.
    #[error("Not in session")]
    NotInSession,

    /// Flip before the game has started.
    #[error("Game has not started")]
    GameNotStarted,

    /// Flip by a player who does not hold the turn.
    #[error("Not your turn")]
    NotYourTurn,

    /// Flip while a mismatched pair is still face-up.
    #[error("Waiting for cards to turn back")]
    ResolutionPending,
}
