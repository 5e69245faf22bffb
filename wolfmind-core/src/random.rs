//! Randomness injected into a game.
//!
//! Every game owns exactly one [`RandomSource`]. Production games use a
//! seeded ChaCha stream; tests can script the exact draws with
//! [`SequenceRandom`].

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Uniform draws for one game.
pub trait RandomSource: Send {
    /// Next draw, uniform in `[0, 1)`.
    fn next_unit(&mut self) -> f32;

    /// Uniform draw in `[lo, hi)`. Returns `lo` when the range is empty.
    fn uniform(&mut self, lo: f32, hi: f32) -> f32 {
        if hi <= lo {
            return lo;
        }
        lo + (hi - lo) * self.next_unit()
    }

    /// `true` with probability `p`.
    fn chance(&mut self, p: f32) -> bool {
        self.next_unit() < p
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "index() on an empty range");
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let i = (self.next_unit() * len as f32) as usize;
        i.min(len.saturating_sub(1))
    }
}

/// Fisher-Yates shuffle driven by `rng`.
pub fn shuffle<T>(rng: &mut dyn RandomSource, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.index(i + 1);
        items.swap(i, j);
    }
}

// ---------------------------------------------------------------------------
// Seeded source
// ---------------------------------------------------------------------------

/// Reproducible source backed by `ChaCha8Rng`.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    /// Create a source from a 64-bit seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Create a source seeded from the OS.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f32 {
        self.rng.gen_range(0.0..1.0)
    }
}

// ---------------------------------------------------------------------------
// Scripted source
// ---------------------------------------------------------------------------

/// Replays a fixed sequence of draws, cycling when exhausted.
///
/// Values are clamped into `[0, 1)` on construction. An empty sequence
/// always yields `0.5`, which makes every perturbation exactly zero.
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    values: Vec<f32>,
    cursor: usize,
}

impl SequenceRandom {
    /// Create a source that replays `values`.
    #[must_use]
    pub fn new(values: Vec<f32>) -> Self {
        let values = values
            .into_iter()
            .map(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, 0.999_999) })
            .collect();
        Self { values, cursor: 0 }
    }

    /// A source whose every draw is `0.5`: zero perturbation, no rumors
    /// (with the default 0.3 rumor probability).
    #[must_use]
    pub fn neutral() -> Self {
        Self::new(Vec::new())
    }

    /// How many draws have been taken so far.
    #[must_use]
    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for SequenceRandom {
    fn next_unit(&mut self) -> f32 {
        let value = if self.values.is_empty() {
            0.5
        } else {
            self.values[self.cursor % self.values.len()]
        };
        self.cursor += 1;
        value
    }
}
