//! Turn Rotation
//!
//! Circular turn order over the roster. Inactive players keep their slot
//! but are skipped. Both operations return a fresh roster snapshot and
//! leave the input untouched.

use crate::core::rng::SessionRng;
use crate::game::error::GameError;
use crate::game::player::{ConnectionId, Player};

/// Hand the first turn to a uniformly random active player.
///
/// Everyone else has `has_turn` cleared. An empty (or fully inactive)
/// roster comes back with nobody holding the turn.
pub fn start_turns(roster: &[Player], rng: &mut SessionRng) -> Vec<Player> {
    let candidates: Vec<usize> = roster
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_active)
        .map(|(i, _)| i)
        .collect();
    let chosen = rng.choose(&candidates).copied();

    roster
        .iter()
        .enumerate()
        .map(|(i, p)| Player {
            has_turn: Some(i) == chosen,
            ..p.clone()
        })
        .collect()
}

/// Pass the turn from `current` to the next active player in roster order.
///
/// Fails with [`GameError::NoEligibleNextPlayer`] when nobody other than
/// `current` is active; the caller keeps its existing roster in that case.
pub fn advance(roster: &[Player], current: ConnectionId) -> Result<Vec<Player>, GameError> {
    let from = roster
        .iter()
        .position(|p| p.id == current)
        .ok_or(GameError::NotInSession)?;

    let len = roster.len();
    let next = (1..len)
        .map(|step| (from + step) % len)
        .find(|i| roster[*i].is_active)
        .ok_or(GameError::NoEligibleNextPlayer)?;

    Ok(roster
        .iter()
        .enumerate()
        .map(|(i, p)| Player {
            has_turn: i == next,
            ..p.clone()
        })
        .collect())
}
