use std::sync::{Mutex, PoisonError};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rug::Integer;
use tlp_types::codec::integer_from_bytes;

use crate::PuzzleError;

pub trait RandomSource: Send + Sync {
    /// Uniform in `[0, n)` and coprime to `n`.
    fn random_mod_n(&self, n: &Integer) -> Result<Integer, PuzzleError>;
    /// A prime of exactly `bits` bits.
    fn random_prime(&self, bits: u32) -> Result<Integer, PuzzleError>;
    fn random_bytes(&self, len: usize) -> Vec<u8>;
}

/// ChaCha20 stream, either seeded for reproducible runs or drawn from OS entropy.
pub struct ChaChaRandom {
    rng: Mutex<ChaCha20Rng>,
}

impl ChaChaRandom {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha20Rng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(ChaCha20Rng::from_entropy()),
        }
    }

    fn fill(&self, buf: &mut [u8]) {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fill_bytes(buf);
    }

    fn random_bits(&self, bits: u32) -> Integer {
        let mut bytes = vec![0u8; bits.div_ceil(8) as usize];
        self.fill(&mut bytes);
        let mut value = integer_from_bytes(&bytes);
        value.keep_bits_mut(bits);
        value
    }

    // Rejection sampling on the bit length of `bound`, at most two draws expected.
    fn random_below(&self, bound: &Integer) -> Integer {
        let bits = bound.significant_bits();
        loop {
            let candidate = self.random_bits(bits);
            if &candidate < bound {
                return candidate;
            }
        }
    }
}

impl RandomSource for ChaChaRandom {
    fn random_mod_n(&self, n: &Integer) -> Result<Integer, PuzzleError> {
        if *n <= 1 {
            return Err(PuzzleError::InvalidModulus);
        }
        loop {
            let r = self.random_below(n);
            if Integer::from(r.gcd_ref(n)) == 1 {
                return Ok(r);
            }
        }
    }

    fn random_prime(&self, bits: u32) -> Result<Integer, PuzzleError> {
        if bits < 3 {
            return Err(PuzzleError::InvalidInput(format!(
                "cannot draw a {}-bit prime",
                bits
            )));
        }
        loop {
            let mut candidate = self.random_bits(bits);
            candidate.set_bit(bits - 1, true);
            candidate.set_bit(bits - 2, true);
            candidate.set_bit(0, true);
            candidate.next_prime_mut();
            if candidate.significant_bits() == bits {
                return Ok(candidate);
            }
        }
    }

    fn random_bytes(&self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        self.fill(&mut bytes);
        bytes
    }
}
