//! Injectable randomness for signal jitter
//!
//! Generators never touch a global RNG. Production code uses an
//! entropy-seeded source, tests stub it with a seeded or constant one.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform random numbers in [0, 1)
pub trait JitterSource: Send {
    /// Next uniform sample in [0, 1)
    fn unit(&mut self) -> f64;

    /// Symmetric jitter in [-amplitude, amplitude)
    fn jitter(&mut self, amplitude: f64) -> f64 {
        (self.unit() - 0.5) * 2.0 * amplitude
    }

    /// Uniform sample in [low, high)
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.unit()
    }
}

impl<J: JitterSource + ?Sized> JitterSource for Box<J> {
    fn unit(&mut self) -> f64 {
        (**self).unit()
    }
}

impl<J: JitterSource + ?Sized> JitterSource for &mut J {
    fn unit(&mut self) -> f64 {
        (**self).unit()
    }
}

/// Unseeded source; not reproducible across runs
pub struct EntropyJitter {
    rng: StdRng,
}

impl EntropyJitter {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for EntropyJitter {
    fn default() -> Self {
        Self::new()
    }
}

impl JitterSource for EntropyJitter {
    fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Reproducible source for a given seed
pub struct SeededJitter {
    rng: StdRng,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl JitterSource for SeededJitter {
    fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Always returns the same sample
#[derive(Debug, Clone, Copy)]
pub struct ConstantJitter(f64);

impl ConstantJitter {
    /// Clamps to [0, 1)
    pub fn new(unit: f64) -> Self {
        Self(unit.clamp(0.0, 1.0 - f64::EPSILON))
    }

    /// Produces zero jitter
    pub fn centered() -> Self {
        Self(0.5)
    }
}

impl JitterSource for ConstantJitter {
    fn unit(&mut self) -> f64 {
        self.0
    }
}
