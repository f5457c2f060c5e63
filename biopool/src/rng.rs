//! Deterministic random number generation for simulation.
//!
//! Every [`crate::SimWorld`] owns one [`SimRng`]. The same seed always yields
//! the same stream, and two worlds never share state, so independent runs can
//! execute on different threads without correlated randomness.

use std::f64::consts::TAU;

use rand::distributions::uniform::SampleUniform;
use rand::distributions::{Distribution, Standard};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::Exp;

/// Seeded random source threaded through every stochastic operation.
#[derive(Debug, Clone)]
pub struct SimRng {
    rng: ChaCha8Rng,
    seed: u64,
}

impl SimRng {
    /// Create a random source from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// The seed this source was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate a value from the standard distribution of `T`.
    pub fn random<T>(&mut self) -> T
    where
        Standard: Distribution<T>,
    {
        self.rng.gen()
    }

    /// Uniform `f64` in `[0, 1)`.
    pub fn random_f64(&mut self) -> f64 {
        self.random()
    }

    /// Generate a value within `range` (exclusive upper bound).
    pub fn random_range<T>(&mut self, range: std::ops::Range<T>) -> T
    where
        T: SampleUniform + PartialOrd,
    {
        self.rng.gen_range(range)
    }

    /// Bernoulli trial.
    pub fn chance(&mut self, p: f64) -> bool {
        self.random_f64() < p
    }

    /// Exponential waiting time with the given rate (mean `1 / rate`).
    ///
    /// Returns `None` for a non-positive or non-finite rate: such an entity
    /// never performs the event.
    pub fn exponential(&mut self, rate: f64) -> Option<f64> {
        if !rate.is_finite() || rate <= 0.0 {
            return None;
        }
        let dist = Exp::new(rate).ok()?;
        Some(dist.sample(&mut self.rng))
    }

    /// Uniform heading in `[0, 2π)`.
    pub fn heading(&mut self) -> f64 {
        self.random_f64() * TAU
    }

    /// Pick an index in `0..len` uniformly, `None` when `len == 0`.
    pub fn pick(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            None
        } else {
            Some(self.random_range(0..len))
        }
    }

    /// Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.random_range(0..i + 1);
            items.swap(i, j);
        }
    }
}
