//! Deterministic seeded RNG wrapper.
//!
//! Training data generation, bootstrap sampling and simulated emergencies all
//! draw from `SeededRng`.  Parallel work derives independent children with
//! [`SeededRng::for_stream`], seeded by:
//!
//!   seed = root_seed XOR (stream * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive stream ids uniformly across the seed space, so
//! each tree in a forest (or each simulated call) gets its own stream no
//! matter which Rayon worker runs it.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal, Poisson};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

pub struct SeededRng(SmallRng);

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        SeededRng(SmallRng::seed_from_u64(seed))
    }

    /// Independent RNG for parallel stream `stream`, derived from `root_seed`
    /// without consuming any state.
    pub fn for_stream(root_seed: u64, stream: u64) -> Self {
        Self::new(root_seed ^ stream.wrapping_add(1).wrapping_mul(MIXING_CONSTANT))
    }

    /// Expose the inner `SmallRng` for use with `rand` distribution types.
    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    #[inline]
    pub fn random<T>(&mut self) -> T
    where
        rand::distributions::Standard: rand::distributions::Distribution<T>,
    {
        self.0.r#gen()
    }

    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// `true` with probability `p` (clamped to [0, 1]; NaN is never true).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        if p.is_nan() {
            return false;
        }
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Uniform float in `[lo, hi)`; returns `lo` when the range is empty.
    #[inline]
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if hi > lo { self.0.gen_range(lo..hi) } else { lo }
    }

    /// Normal sample.  A negative or non-finite `std_dev` yields `mean`.
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        match Normal::new(mean, std_dev) {
            Ok(dist) => dist.sample(&mut self.0),
            Err(_) => mean,
        }
    }

    /// Exponential sample with the given mean; `0.0` for a non-positive mean.
    pub fn exponential(&mut self, mean: f64) -> f64 {
        if mean.is_nan() || mean <= 0.0 {
            return 0.0;
        }
        match Exp::new(mean.recip()) {
            Ok(dist) => dist.sample(&mut self.0),
            Err(_) => 0.0,
        }
    }

    /// Poisson count; `0` for a non-positive `lambda`.
    pub fn poisson(&mut self, lambda: f64) -> u32 {
        match Poisson::new(lambda) {
            Ok(dist) => {
                let k: f64 = dist.sample(&mut self.0);
                k as u32
            }
            Err(_) => 0,
        }
    }

    /// Shuffle a mutable slice in-place (Fisher-Yates).
    #[inline]
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        slice.shuffle(&mut self.0);
    }

    /// Choose a random element from a slice; `None` if empty.
    #[inline]
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        use rand::seq::SliceRandom;
        slice.choose(&mut self.0)
    }
}
