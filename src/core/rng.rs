//! Deterministic random number generation for replayable matches.
//!
//! ## Key Features
//!
//! - **Deterministic**: the same seed produces an identical draw sequence,
//!   which makes server-authoritative replay and client-side prediction
//!   comparable bit-for-bit.
//! - **Position capture**: O(1) state capture and restore via the ChaCha8
//!   word position, regardless of how many values were drawn.
//! - **Draw counting**: every draw increments a counter; the transport layer
//!   uses it to detect whether a command consumed randomness during an
//!   optimistic local run.
//! - **Forkable**: independent branches for speculative client-side runs.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Deterministic RNG for match execution.
///
/// Uses ChaCha8 for speed while maintaining high-quality randomness.
/// All randomness in the engine flows through this type; nothing else
/// may draw random values.
#[derive(Clone, Debug)]
pub struct MatchRng {
    inner: ChaCha8Rng,
    seed: u64,
    draw_count: u64,
}

impl MatchRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
            draw_count: 0,
        }
    }

    /// Fork this RNG to create an independent branch.
    ///
    /// The fork is seeded from the parent's seed and draw position, so the
    /// same parent history always yields the same fork. Used for speculative
    /// client-side runs that must not disturb the parent sequence.
    #[must_use]
    pub fn fork(&self) -> Self {
        let fork_seed = self
            .seed
            .wrapping_add((self.draw_count + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        Self::new(fork_seed)
    }

    /// Number of draws taken from this RNG since creation or restore.
    ///
    /// The optimistic executor snapshots this before a local pipeline run to
    /// detect commands that depend on hidden randomness.
    #[must_use]
    pub fn draws(&self) -> u64 {
        self.draw_count
    }

    /// Roll a die: uniform value in `1..=max`.
    pub fn roll(&mut self, max: i64) -> i64 {
        self.draw_count += 1;
        self.inner.gen_range(1..=max.max(1))
    }

    /// Generate a random integer in the given range.
    pub fn gen_range(&mut self, range: std::ops::Range<i64>) -> i64 {
        self.draw_count += 1;
        self.inner.gen_range(range)
    }

    /// Generate a random usize in the given range.
    pub fn gen_range_usize(&mut self, range: std::ops::Range<usize>) -> usize {
        self.draw_count += 1;
        self.inner.gen_range(range)
    }

    /// Generate a random boolean with the given probability of `true`.
    pub fn gen_bool(&mut self, probability: f64) -> bool {
        self.draw_count += 1;
        self.inner.gen_bool(probability)
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        self.draw_count += 1;
        slice.shuffle(&mut self.inner);
    }

    /// Choose a random element from a slice.
    #[must_use]
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        use rand::seq::SliceRandom;
        self.draw_count += 1;
        slice.choose(&mut self.inner)
    }

    /// Capture the current state for serialization.
    #[must_use]
    pub fn state(&self) -> MatchRngState {
        MatchRngState {
            seed: self.seed,
            word_pos: self.inner.get_word_pos(),
            draw_count: self.draw_count,
        }
    }

    /// Restore from a captured state.
    #[must_use]
    pub fn from_state(state: &MatchRngState) -> Self {
        let mut inner = ChaCha8Rng::seed_from_u64(state.seed);
        inner.set_word_pos(state.word_pos);
        Self {
            inner,
            seed: state.seed,
            draw_count: state.draw_count,
        }
    }
}

/// Serializable RNG state for checkpointing.
///
/// Uses the ChaCha8 word position for O(1) serialization regardless of
/// how many values have been drawn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRngState {
    /// Original seed.
    pub seed: u64,
    /// ChaCha8 word position (128-bit counter).
    pub word_pos: u128,
    /// Draws taken so far.
    pub draw_count: u64,
}
