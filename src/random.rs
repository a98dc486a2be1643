//! Injectable randomness for worker and task generation.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{Result, SimError};

/// Letters used for generated names: ASCII upper then lower case.
pub const IDENTIFIER_ALPHABET: &[u8; 52] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
/// Length of generated worker and task names.
pub const DEFAULT_IDENTIFIER_LEN: usize = 10;

/// Random integers and identifiers drawn from a caller-supplied RNG.
#[derive(Debug, Clone)]
pub struct RandomGenerator<R = ChaCha8Rng> {
    rng: R,
}

impl RandomGenerator<ChaCha8Rng> {
    /// Reproducible generator; the same seed yields the same run.
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Uniform integer in `[min, max]`; `min > max` is rejected.
    pub fn random_int(&mut self, min: u32, max: u32) -> Result<u32> {
        if min > max {
            return Err(SimError::InvalidRange {
                field: "random_int",
                min: u64::from(min),
                max: u64::from(max),
            });
        }
        Ok(self.rng.random_range(min..=max))
    }

    /// `len` letters drawn independently from [`IDENTIFIER_ALPHABET`].
    pub fn random_identifier(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| {
                let index = self.rng.random_range(0..IDENTIFIER_ALPHABET.len());
                char::from(IDENTIFIER_ALPHABET[index])
            })
            .collect()
    }
}
