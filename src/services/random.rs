//! Random source abstraction for the interleaver.
//!
//! Production requests get a freshly OS-seeded generator; tests and debugging
//! sessions pass an explicit seed so merges are reproducible.

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Uniform random draws consumed by the interleaver
pub trait RandomSource {
    /// Uniform integer in `[lo, hi]` (inclusive on both ends)
    fn next_int(&mut self, lo: usize, hi: usize) -> usize;

    /// Uniform float in `[0.0, 1.0)`
    fn next_float01(&mut self) -> f64;
}

/// `RandomSource` backed by `StdRng`
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Reproducible generator for a fixed seed
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Non-deterministic generator seeded from the OS
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Seeded when `seed` is set, OS-seeded otherwise
    pub fn for_request(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::from_seed(seed),
            None => Self::from_os_rng(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_int(&mut self, lo: usize, hi: usize) -> usize {
        if lo >= hi {
            return lo;
        }
        self.rng.random_range(lo..=hi)
    }

    fn next_float01(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Replays fixed draws, for tests that need an exact merge order.
///
/// Integers are clamped to the requested range. Running out of scripted
/// values panics so a test never silently depends on an unplanned draw.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ScriptedRandom {
    ints: std::collections::VecDeque<usize>,
    floats: std::collections::VecDeque<f64>,
}

#[cfg(test)]
impl ScriptedRandom {
    pub(crate) fn new(ints: Vec<usize>, floats: Vec<f64>) -> Self {
        Self {
            ints: ints.into(),
            floats: floats.into(),
        }
    }
}

#[cfg(test)]
impl RandomSource for ScriptedRandom {
    fn next_int(&mut self, lo: usize, hi: usize) -> usize {
        self.ints
            .pop_front()
            .expect("scripted integer draws exhausted")
            .clamp(lo, hi)
    }

    fn next_float01(&mut self) -> f64 {
        self.floats
            .pop_front()
            .expect("scripted float draws exhausted")
    }
}
