//! # Randomness Source
//!
//! Every random draw the engine makes — the present-participant shuffle,
//! snooze jitter during queue formation, display-code letters — goes
//! through the [`Randomness`] trait so selection sequences are
//! reproducible when a fixed source is injected.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// An injectable source of randomness for the queue engine.
///
/// The trait is object safe on purpose: the engine takes
/// `&mut dyn Randomness` so tests can substitute a deterministic source
/// without generic plumbing.
pub trait Randomness {
    /// Shuffle a slice of positions uniformly at random.
    fn shuffle(&mut self, positions: &mut [usize]);

    /// Uniform draw from the half-open range `[lo, hi)`. `hi <= lo`
    /// collapses to `lo`.
    fn uniform(&mut self, lo: u32, hi: u32) -> u32;
}

/// Thread-RNG backed source for normal operation.
#[derive(Debug, Default)]
pub struct ThreadRandomness;

impl Randomness for ThreadRandomness {
    fn shuffle(&mut self, positions: &mut [usize]) {
        positions.shuffle(&mut rand::thread_rng());
    }

    fn uniform(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        rand::thread_rng().gen_range(lo..hi)
    }
}

/// Seeded source for reproducible sessions.
#[derive(Debug)]
pub struct SeededRandomness {
    rng: StdRng,
}

impl SeededRandomness {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Randomness for SeededRandomness {
    fn shuffle(&mut self, positions: &mut [usize]) {
        positions.shuffle(&mut self.rng);
    }

    fn uniform(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..hi)
    }
}
