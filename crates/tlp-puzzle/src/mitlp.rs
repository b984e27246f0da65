use std::sync::Arc;

use tlp_types::{AuxiliaryInfo, Digest, MitlpPublic, MitlpSecret, TlpPuzzle};

use crate::PuzzleError;
use crate::chain::{
    Delays, SealInput, SolveChain, SolvedIter, check_len, check_secret_widths, encode_base,
    seal_puzzle, verify_commitment,
};
use crate::config::COMMITMENT_LENGTH;
use crate::primitives::{HashFunction, Sha512Hash};
use crate::squaring::CancellationToken;
use crate::tlp::Tlp;

/// Multiple messages sharing one forced delay `t`.
#[derive(Clone)]
pub struct Mitlp {
    tlp: Tlp,
    hash: Arc<dyn HashFunction>,
}

impl Mitlp {
    pub fn new(tlp: Tlp, hash: Arc<dyn HashFunction>) -> Self {
        Mitlp { tlp, hash }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(Tlp::seeded(seed), Arc::new(Sha512Hash))
    }

    pub fn from_entropy() -> Self {
        Self::new(Tlp::from_entropy(), Arc::new(Sha512Hash))
    }

    pub fn setup(
        &self,
        z: usize,
        interval: u64,
        squarings_per_second: u64,
        keysize: u32,
    ) -> Result<(MitlpPublic, MitlpSecret), PuzzleError> {
        if z < 1 {
            return Err(PuzzleError::InvalidInput(
                "a chain needs at least one puzzle".to_string(),
            ));
        }
        let (pk, sk) = self.tlp.setup(interval, squarings_per_second, keysize)?;
        let len_r = (keysize / 8) as usize;
        let random = self.tlp.random();

        let mut r = Vec::with_capacity(z);
        r.push(encode_base(&pk.r, len_r)?);
        for _ in 1..z {
            r.push(encode_base(&random.random_mod_n(&pk.n)?, len_r)?);
        }
        let d = (0..z).map(|_| random.random_bytes(COMMITMENT_LENGTH)).collect();
        log::info!("mitlp setup: z={} t={}", z, pk.t);

        let aux = AuxiliaryInfo {
            hash_name: self.hash.name().to_string(),
            len_commitment: COMMITMENT_LENGTH,
            len_r,
        };
        Ok((
            MitlpPublic {
                aux,
                n: pk.n,
                t: pk.t,
                r0: pk.r,
            },
            MitlpSecret { a: sk.a, r, d },
        ))
    }

    /// Seals `messages[i] || d[i] || r[i + 1]`; the last puzzle carries no base.
    pub fn generate(
        &self,
        messages: &[Vec<u8>],
        pk: &MitlpPublic,
        sk: &MitlpSecret,
    ) -> Result<(Vec<TlpPuzzle>, Vec<Digest>), PuzzleError> {
        let z = messages.len();
        if z < 1 {
            return Err(PuzzleError::InvalidInput("no messages".to_string()));
        }
        check_len("random bases", z, sk.r.len())?;
        check_len("commitments", z, sk.d.len())?;
        check_secret_widths(&pk.aux, &sk.r, &sk.d)?;

        let mut puzzles = Vec::with_capacity(z);
        let mut digests = Vec::with_capacity(z);
        for (i, message) in messages.iter().enumerate() {
            let next_r = if i + 1 < z {
                Some(sk.r[i + 1].as_slice())
            } else {
                None
            };
            let (puzzle, digest) = seal_puzzle(
                &self.tlp,
                self.hash.as_ref(),
                SealInput {
                    n: &pk.n,
                    r: &sk.r[i],
                    a: &sk.a,
                    message,
                    d: &sk.d[i],
                    next_r,
                },
            )?;
            puzzles.push(puzzle);
            digests.push(digest);
        }
        log::debug!("mitlp generated {} puzzles", z);
        Ok((puzzles, digests))
    }

    pub fn solve<'a>(&'a self, pk: &'a MitlpPublic, puzzles: &'a [TlpPuzzle]) -> SolvedIter<'a> {
        self.solve_with_cancellation(pk, puzzles, CancellationToken::new())
    }

    pub fn solve_with_cancellation<'a>(
        &'a self,
        pk: &'a MitlpPublic,
        puzzles: &'a [TlpPuzzle],
        cancelled: CancellationToken,
    ) -> SolvedIter<'a> {
        Box::new(SolveChain::new(
            &self.tlp,
            &pk.aux,
            &pk.n,
            &pk.r0,
            Delays::Shared(&pk.t),
            puzzles,
            cancelled,
        ))
    }

    pub fn verify(&self, message: &[u8], commitment: &[u8], digest: &[u8]) -> Result<(), PuzzleError> {
        verify_commitment(self.hash.as_ref(), message, commitment, digest)
    }
}
