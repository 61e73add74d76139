//! Seeded random number generation for weight initialization and dropout.
//!
//! Every component that needs randomness receives a [`NetRng`] explicitly, so a
//! whole network (initial weights and dropout masks) is reproducible from one seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Random number generator injected into layer constructors.
///
/// Wraps [`StdRng`] and adds the handful of samplers the network needs.
#[derive(Debug, Clone)]
pub struct NetRng {
    inner: StdRng,
}

impl NetRng {
    /// Create a new RNG with an explicit seed.
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Create an RNG seeded from operating system entropy.
    pub fn from_entropy() -> Self {
        Self {
            inner: StdRng::from_entropy(),
        }
    }

    /// Derive an independent generator from this one.
    ///
    /// Layers that sample during training (dropout) own a forked generator so
    /// their draws do not depend on how many weights were initialized after them.
    pub fn fork(&mut self) -> Self {
        Self::new(self.inner.gen())
    }

    /// Uniform sample in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.inner.gen()
    }

    /// Uniform sample in [low, high).
    pub fn gen_range_f64(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Gaussian sample with the given mean and standard deviation.
    pub fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        let z: f64 = self.inner.sample(StandardNormal);
        mean + std_dev * z
    }
}
