use std::sync::Arc;

use rug::Integer;
use tlp_types::{TlpPublic, TlpPuzzle, TlpSecret};

use crate::PuzzleError;
use crate::primitives::{
    AesGcmCipher, ChaChaRandom, ModulusGenerator, PrimeModulus, RandomSource, SymmetricCipher,
};
use crate::squaring::{CancellationToken, repeated_squaring};

/// The atomic time-lock puzzle over an RSA modulus.
#[derive(Clone)]
pub struct Tlp {
    cipher: Arc<dyn SymmetricCipher>,
    modulus: Arc<dyn ModulusGenerator>,
    random: Arc<dyn RandomSource>,
}

impl Tlp {
    pub fn new(
        cipher: Arc<dyn SymmetricCipher>,
        modulus: Arc<dyn ModulusGenerator>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Tlp {
            cipher,
            modulus,
            random,
        }
    }

    /// AES-GCM with primes and bases drawn from `random`.
    pub fn with_random(random: Arc<dyn RandomSource>) -> Self {
        let modulus = Arc::new(PrimeModulus::new(random.clone()));
        Self::new(Arc::new(AesGcmCipher), modulus, random)
    }

    /// Reproducible moduli and bases. Symmetric keys stay unpredictable.
    pub fn seeded(seed: u64) -> Self {
        Self::with_random(Arc::new(ChaChaRandom::seeded(seed)))
    }

    pub fn from_entropy() -> Self {
        Self::with_random(Arc::new(ChaChaRandom::from_entropy()))
    }

    pub fn cipher(&self) -> &Arc<dyn SymmetricCipher> {
        &self.cipher
    }

    pub fn random(&self) -> &Arc<dyn RandomSource> {
        &self.random
    }

    pub fn setup(
        &self,
        interval: u64,
        squarings_per_second: u64,
        keysize: u32,
    ) -> Result<(TlpPublic, TlpSecret), PuzzleError> {
        let modulus = self.modulus.generate(keysize)?;
        let r = self.random.random_mod_n(&modulus.n)?;
        let t = Integer::from(interval) * squarings_per_second;
        let a = trapdoor(&t, &modulus.phi_n)?;
        log::debug!("tlp setup: keysize={} t={}", keysize, t);

        Ok((
            TlpPublic { n: modulus.n, t, r },
            TlpSecret {
                p: modulus.p,
                q: modulus.q,
                phi_n: modulus.phi_n,
                a,
            },
        ))
    }

    pub fn generate(
        &self,
        pk: &TlpPublic,
        a: &Integer,
        message: &[u8],
    ) -> Result<TlpPuzzle, PuzzleError> {
        self.seal(&pk.n, &pk.r, a, message)
    }

    pub fn solve(&self, pk: &TlpPublic, puzzle: &TlpPuzzle) -> Result<Vec<u8>, PuzzleError> {
        self.solve_with_cancellation(pk, puzzle, &CancellationToken::new())
    }

    pub fn solve_with_cancellation(
        &self,
        pk: &TlpPublic,
        puzzle: &TlpPuzzle,
        cancelled: &CancellationToken,
    ) -> Result<Vec<u8>, PuzzleError> {
        self.unlock(&pk.n, &pk.t, &pk.r, puzzle, cancelled)
    }

    /// `encrypted_key = (k + r^a) mod n`, message under a fresh key `k`.
    pub(crate) fn seal(
        &self,
        n: &Integer,
        r: &Integer,
        a: &Integer,
        message: &[u8],
    ) -> Result<TlpPuzzle, PuzzleError> {
        let k = self.cipher.generate_key();
        if &k >= n {
            return Err(PuzzleError::KeyOutOfRange);
        }
        let b = r
            .pow_mod_ref(a, n)
            .map(Integer::from)
            .ok_or_else(|| PuzzleError::Arithmetic("r^a mod n is undefined".to_string()))?;
        let encrypted_key = (k.clone() + b) % n;
        let encrypted_message = self.cipher.encrypt(&k, message)?;
        Ok(TlpPuzzle::new(encrypted_key, encrypted_message))
    }

    pub(crate) fn unlock(
        &self,
        n: &Integer,
        t: &Integer,
        r: &Integer,
        puzzle: &TlpPuzzle,
        cancelled: &CancellationToken,
    ) -> Result<Vec<u8>, PuzzleError> {
        let b = repeated_squaring(r, t, n, cancelled)?;
        let mut k = Integer::from(&puzzle.encrypted_key - &b) % n;
        if k.is_negative() {
            k += n;
        }
        self.cipher.decrypt(&k, &puzzle.encrypted_message)
    }
}

/// `2^t mod phi`, the shortcut only the factorization holder can take.
pub(crate) fn trapdoor(t: &Integer, phi_n: &Integer) -> Result<Integer, PuzzleError> {
    Integer::from(2)
        .pow_mod(t, phi_n)
        .map_err(|_| PuzzleError::Arithmetic("2^t mod phi(n) is undefined".to_string()))
}
