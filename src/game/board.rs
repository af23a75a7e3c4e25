//! Board Generation
//!
//! Draws distinct symbols from a fixed pool, duplicates them into pairs
//! and shuffles the result into board positions.

use serde::{Serialize, Deserialize};

use crate::core::rng::SessionRng;
use crate::game::error::GameError;

/// Symbols available for card faces.
pub const SYMBOL_POOL: [&str; 50] = [
    "🍎", "🍌", "🍇", "🍉", "🍒", "🍓", "🍍", "🥝", "🥥", "🍑",
    "🐶", "🐱", "🐭", "🐹", "🐰", "🦊", "🐻", "🐼", "🐨", "🐯",
    "🦁", "🐮", "🐷", "🐸", "🐵", "🐔", "🐧", "🐦", "🦆", "🦉",
    "⚽", "🏀", "🏈", "⚾", "🎾", "🏐", "🎱", "🏓", "🎯", "🎲",
    "🚗", "🚕", "🚌", "🚑", "🚒", "🚜", "🚲", "🚀", "🛸", "⛵",
];

/// Fewest pairs a board may hold.
pub const MIN_PAIRS: usize = 2;

/// Most pairs a board may hold.
pub const MAX_PAIRS: usize = 25;

/// Index into [`SYMBOL_POOL`].
pub type FaceId = u8;

/// One board slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Slot index (stable for the whole round)
    pub position: usize,
    /// Symbol on the face; exactly two cards share it
    pub face: FaceId,
    /// Face-up
    pub is_flipped: bool,
    /// Part of a resolved pair (always face-up)
    pub is_matched: bool,
}

impl Card {
    /// Symbol text for this card's face.
    pub fn symbol(&self) -> &'static str {
        SYMBOL_POOL[self.face as usize]
    }

    /// Face-up but not yet part of a resolved pair.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.is_flipped && !self.is_matched
    }
}

/// Ordered sequence of cards; index equals `Card::position`.
pub type Board = Vec<Card>;

/// Check a requested pair count against the supported range.
pub fn validate_pair_count(pair_count: usize) -> Result<(), GameError> {
    if !(MIN_PAIRS..=MAX_PAIRS).contains(&pair_count) || pair_count > SYMBOL_POOL.len() {
        return Err(GameError::InvalidConfiguration(format!(
            "pair count {} outside {}..={}",
            pair_count, MIN_PAIRS, MAX_PAIRS
        )));
    }
    Ok(())
}

/// Generate a shuffled board of `2 * pair_count` face-down cards.
pub fn generate(pair_count: usize, rng: &mut SessionRng) -> Result<Board, GameError> {
    validate_pair_count(pair_count)?;

    let symbols = rng.sample_indices(SYMBOL_POOL.len(), pair_count);
    let mut faces: Vec<FaceId> = symbols
        .iter()
        .chain(symbols.iter())
        .map(|s| *s as FaceId)
        .collect();
    rng.shuffle(&mut faces);

    Ok(faces
        .into_iter()
        .enumerate()
        .map(|(position, face)| Card {
            position,
            face,
            is_flipped: false,
            is_matched: false,
        })
        .collect())
}

/// Positions of cards that are face-up but unresolved.
pub fn pending_positions(board: &[Card]) -> Vec<usize> {
    board.iter().filter(|c| c.is_pending()).map(|c| c.position).collect()
}

/// Every card on the board has been matched.
pub fn is_cleared(board: &[Card]) -> bool {
    !board.is_empty() && board.iter().all(|c| c.is_matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use proptest::prelude::*;

    fn face_counts(board: &[Card]) -> BTreeMap<FaceId, usize> {
        let mut counts = BTreeMap::new();
        for card in board {
            *counts.entry(card.face).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_generate_smallest_board() {
        let mut rng = SessionRng::new(7);
        let board = generate(2, &mut rng).unwrap();

        assert_eq!(board.len(), 4);
        let counts = face_counts(&board);
        assert_eq!(counts.len(), 2);
        assert!(counts.values().all(|n| *n == 2));
    }

    #[test]
    fn test_positions_match_indices() {
        let mut rng = SessionRng::new(8);
        let board = generate(10, &mut rng).unwrap();
        for (i, card) in board.iter().enumerate() {
            assert_eq!(card.position, i);
            assert!(!card.is_flipped);
            assert!(!card.is_matched);
        }
    }

    #[test]
    fn test_rejects_out_of_range() {
        let mut rng = SessionRng::new(1);
        assert!(matches!(generate(0, &mut rng), Err(GameError::InvalidConfiguration(_))));
        assert!(matches!(generate(1, &mut rng), Err(GameError::InvalidConfiguration(_))));
        assert!(matches!(generate(MAX_PAIRS + 1, &mut rng), Err(GameError::InvalidConfiguration(_))));
        assert!(matches!(generate(51, &mut rng), Err(GameError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_same_seed_same_board() {
        let a = generate(8, &mut SessionRng::new(99)).unwrap();
        let b = generate(8, &mut SessionRng::new(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cleared_and_pending() {
        let mut board = generate(2, &mut SessionRng::new(3)).unwrap();
        assert!(!is_cleared(&board));
        assert!(!is_cleared(&[]));

        board[1].is_flipped = true;
        assert_eq!(pending_positions(&board), vec![1]);

        for card in &mut board {
            card.is_flipped = true;
            card.is_matched = true;
        }
        assert!(is_cleared(&board));
        assert!(pending_positions(&board).is_empty());
    }

    proptest! {
        #[test]
        fn prop_board_is_pairs_of_distinct_faces(pairs in MIN_PAIRS..=MAX_PAIRS, seed in any::<u64>()) {
            let board = generate(pairs, &mut SessionRng::new(seed)).unwrap();
            prop_assert_eq!(board.len(), pairs * 2);

            let counts = face_counts(&board);
            prop_assert_eq!(counts.len(), pairs);
            prop_assert!(counts.values().all(|n| *n == 2));
            prop_assert!(counts.keys().all(|f| (*f as usize) < SYMBOL_POOL.len()));
        }
    }
}
