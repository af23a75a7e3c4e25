//! Seedable Random Number Generator
//!
//! Uses Xorshift128+ for fast, reproducible randomness.
//! Given the same seed, produces an identical sequence on all platforms,
//! which lets tests pin board layouts and turn order.

use sha2::{Sha256, Digest};

/// PRNG using the Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use memory_match::core::rng::SessionRng;
///
/// let mut a = SessionRng::new(12345);
/// let mut b = SessionRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug)]
pub struct SessionRng {
    state: [u64; 2],
}

impl SessionRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Ensure state is never all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random index in range [0, max).
    ///
    /// Uses rejection sampling so small boards are not skewed.
    #[inline]
    pub fn next_index(&mut self, max: usize) -> usize {
        if max <= 1 {
            return 0;
        }
        let max = max as u64;
        let zone = u64::MAX - (u64::MAX % max);
        loop {
            let v = self.next_u64();
            if v < zone {
                return (v % max) as usize;
            }
        }
    }

    /// Shuffle a slice in place using Fisher-Yates algorithm.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        let len = slice.len();
        for i in (1..len).rev() {
            let j = self.next_index(i + 1);
            slice.swap(i, j);
        }
    }

    /// Select a random element from a slice.
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            let idx = self.next_index(slice.len());
            Some(&slice[idx])
        }
    }

    /// Pick `amount` distinct indices from `0..len`, without replacement.
    ///
    /// Runs a partial Fisher-Yates over the index range, so every subset
    /// is equally likely. `amount` is clamped to `len`.
    pub fn sample_indices(&mut self, len: usize, amount: usize) -> Vec<usize> {
        let amount = amount.min(len);
        let mut indices: Vec<usize> = (0..len).collect();
        for i in 0..amount {
            let j = i + self.next_index(len - i);
            indices.swap(i, j);
        }
        indices.truncate(amount);
        indices
    }
}

/// SplitMix64 for seed initialization.
/// Produces well-distributed values from sequential seeds.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Pull a 64-bit seed from a v4 UUID.
pub fn entropy_seed() -> u64 {
    let bytes = uuid::Uuid::new_v4().into_bytes();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(seed)
}

/// Derive the board seed for one round.
///
/// Mixes the session's base entropy with the session generation and the
/// round index, so every round (and every restarted session) shuffles
/// independently while staying reproducible from the base seed.
pub fn derive_round_seed(base_seed: u64, generation: u64, round_index: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"MEMORY_MATCH_ROUND_V1");
    hasher.update(base_seed.to_le_bytes());
    hasher.update(generation.to_le_bytes());
    hasher.update(round_index.to_le_bytes());

    hasher.finalize().into()
}

/// Fold a derived round digest down to an RNG seed (first 8 bytes).
pub fn seed_from_digest(digest: &[u8; 32]) -> u64 {
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed)
}

// =============================================================================
// TESTS
// =============================================================================
