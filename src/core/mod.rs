//! Core primitives.
//!
//! Nothing in here knows about cards or players.

pub mod rng;

// Re-export core types
pub use rng::SessionRng;
