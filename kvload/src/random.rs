//! Sources of randomness for the workload drivers.
//!
//! Drivers never touch a global generator. They draw from a [`RandomSource`] that is handed to
//! them on every iteration, so tests can script the exact sequence of draws.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Characters used for random value suffixes.
const ALPHANUMERIC: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Largest bound [`sample_key`] can sample from uniformly.
///
/// Keys are derived from an `f64` fraction, which only represents integers exactly up to 2^53.
pub const MAX_KEY_BOUND: u64 = 1 << 53;

/// A source of uniformly distributed fractions.
pub trait RandomSource {
    /// Returns the next fraction in `[0, 1)`.
    fn next(&mut self) -> f64;
}

impl RandomSource for SmallRng {
    fn next(&mut self) -> f64 {
        self.random()
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next(&mut self) -> f64 {
        (**self).next()
    }
}

/// Creates a fast, independently seeded generator for one virtual user.
pub fn seeded(seed: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed)
}

/// A deterministic source that replays a fixed list of fractions in a loop.
///
/// Values outside of `[0, 1)` are clamped into that range. An empty list always yields `0.0`.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: Vec<f64>,
    position: usize,
}

impl ScriptedRandom {
    /// Creates a source replaying `values` in order.
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            position: 0,
        }
    }

    /// A source that always returns the same fraction.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for ScriptedRandom {
    fn next(&mut self) -> f64 {
        let Some(&value) = self.values.get(self.position) else {
            return 0.0;
        };
        self.position = (self.position + 1) % self.values.len();
        value.clamp(0.0, 1.0 - f64::EPSILON)
    }
}

/// Samples an integer uniformly from `[1, bound]`.
///
/// `bound` must be within `1..=MAX_KEY_BOUND`.
pub fn sample_key(rng: &mut impl RandomSource, bound: u64) -> u64 {
    let key = (rng.next() * bound as f64) as u64 + 1;
    // Guard against rounding up to `bound + 1` for fractions very close to 1.
    key.min(bound)
}

/// Generates `len` random lowercase alphanumeric characters.
pub fn alphanumeric(rng: &mut impl RandomSource, len: usize) -> String {
    (0..len)
        .map(|_| {
            let idx = (rng.next() * ALPHANUMERIC.len() as f64) as usize;
            ALPHANUMERIC[idx.min(ALPHANUMERIC.len() - 1)] as char
        })
        .collect()
}
