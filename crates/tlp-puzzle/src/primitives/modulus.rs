use std::sync::Arc;

use rug::Integer;

use crate::PuzzleError;
use crate::config::MIN_KEYSIZE;
use crate::primitives::RandomSource;

/// `n = p * q` with its factorization and Euler totient.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaModulus {
    pub n: Integer,
    pub p: Integer,
    pub q: Integer,
    pub phi_n: Integer,
}

impl std::fmt::Debug for RsaModulus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaModulus")
            .field("n", &self.n)
            .field("factors", &"<redacted>")
            .finish()
    }
}

pub trait ModulusGenerator: Send + Sync {
    fn generate(&self, keysize: u32) -> Result<RsaModulus, PuzzleError>;
}

pub fn validate_keysize(keysize: u32) -> Result<(), PuzzleError> {
    if keysize < MIN_KEYSIZE {
        return Err(PuzzleError::InvalidKeySize {
            keysize,
            reason: "below the minimum modulus size",
        });
    }
    if keysize % 16 != 0 {
        return Err(PuzzleError::InvalidKeySize {
            keysize,
            reason: "must be a multiple of 16",
        });
    }
    Ok(())
}

/// Two distinct `keysize / 2`-bit primes drawn from a [`RandomSource`].
pub struct PrimeModulus {
    random: Arc<dyn RandomSource>,
}

impl PrimeModulus {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }
}

impl ModulusGenerator for PrimeModulus {
    fn generate(&self, keysize: u32) -> Result<RsaModulus, PuzzleError> {
        validate_keysize(keysize)?;
        let half = keysize / 2;

        let p = self.random.random_prime(half)?;
        let q = loop {
            let q = self.random.random_prime(half)?;
            if q != p {
                break q;
            }
        };

        let n = Integer::from(&p * &q);
        let phi_n = Integer::from(&p - 1u32) * Integer::from(&q - 1u32);
        log::trace!("generated {}-bit modulus", n.significant_bits());
        Ok(RsaModulus { n, p, q, phi_n })
    }
}
