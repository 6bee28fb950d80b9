//! Randomizer: deterministic shuffling and exclusion-aware picking.
//!
//! ## Key Features
//!
//! - **Deterministic**: Same seed produces identical sequence
//! - **Non-destructive**: `shuffle` returns a new list, the input is untouched
//! - **Context streams**: Independent sequences for setup, dice rolls, colors
//!
//! ## Usage
//!
//! ```
//! use rust_tabletop::core::GameRng;
//!
//! let mut rng = GameRng::new(42);
//! let deck = vec!["c1", "c2", "c3", "c4"];
//!
//! // Iteration count 0 keeps the original order
//! assert_eq!(rng.shuffle(&deck, Some(0)), deck);
//!
//! // Picks never return an excluded value
//! let color = rng.pick_random(&["red", "green", "blue"], &["red", "blue"]);
//! assert_eq!(color, Some(&"green"));
//! ```

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::hash::{Hash, Hasher};

/// Seeded RNG shared by the setup resolver and the action engine.
///
/// Uses ChaCha8 so that two participants seeded identically roll the same
/// sequence. Live play never relies on that: rolled values travel in the
/// operation arguments.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed this RNG was created with.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Create an independent stream for a specific context.
    ///
    /// The same context always produces the same stream from the same seed.
    #[must_use]
    pub fn for_context(&self, context: &str) -> Self {
        let mut hasher = rustc_hash::FxHasher::default();
        self.seed.hash(&mut hasher);
        context.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Return a shuffled copy of `list`.
    ///
    /// - `Some(0)`: copy in original order (deterministic tests)
    /// - `Some(n)`: `n` random pairwise swaps
    /// - `None`: full Fisher-Yates pass
    #[must_use]
    pub fn shuffle<T: Clone>(&mut self, list: &[T], iterations: Option<usize>) -> Vec<T> {
        let mut shuffled = list.to_vec();
        if shuffled.len() < 2 {
            return shuffled;
        }
        match iterations {
            None => shuffled.shuffle(&mut self.inner),
            Some(count) => {
                let len = shuffled.len();
                for _ in 0..count {
                    let a = self.inner.gen_range(0..len);
                    let b = self.inner.gen_range(0..len);
                    shuffled.swap(a, b);
                }
            }
        }
        shuffled
    }

    /// Pick one element of `candidates` that is not in `excluded`.
    ///
    /// Returns `None` when every candidate is excluded; callers that need a
    /// value must reserve at least one free candidate.
    #[must_use]
    pub fn pick_random<'a, T: PartialEq>(
        &mut self,
        candidates: &'a [T],
        excluded: &[T],
    ) -> Option<&'a T> {
        let available: Vec<&'a T> = candidates
            .iter()
            .filter(|candidate| !excluded.contains(candidate))
            .collect();
        available.choose(&mut self.inner).copied()
    }

    /// Roll a face in `1..=max`. A `max` of 0 always yields 1.
    pub fn roll(&mut self, max: u32) -> u32 {
        self.inner.gen_range(1..=max.max(1))
    }
}
