use std::sync::Arc;

use rug::Integer;
use tlp_types::{AuxiliaryInfo, Digest, GmitlpPublic, GmitlpSecret, TlpPuzzle};

use crate::PuzzleError;
use crate::chain::{
    ChainedTlp, Delays, SealInput, SolveChain, SolvedIter, SolvedPair, check_len, check_secret_widths,
    encode_base, seal_puzzle, verify_commitment,
};
use crate::config::COMMITMENT_LENGTH;
use crate::primitives::{HashFunction, Sha512Hash};
use crate::squaring::CancellationToken;
use crate::tlp::{Tlp, trapdoor};

/// Chained puzzles with a distinct delay per message over one shared modulus.
#[derive(Clone)]
pub struct Gmitlp {
    tlp: Tlp,
    hash: Arc<dyn HashFunction>,
}

impl Gmitlp {
    pub fn new(tlp: Tlp, hash: Arc<dyn HashFunction>) -> Self {
        Gmitlp { tlp, hash }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(Tlp::seeded(seed), Arc::new(Sha512Hash))
    }

    pub fn from_entropy() -> Self {
        Self::new(Tlp::from_entropy(), Arc::new(Sha512Hash))
    }

    pub fn tlp(&self) -> &Tlp {
        &self.tlp
    }

    pub(crate) fn check_inputs(
        messages: &[Vec<u8>],
        pk: &GmitlpPublic,
        sk: &GmitlpSecret,
    ) -> Result<(), PuzzleError> {
        let z = messages.len();
        if z < 1 {
            return Err(PuzzleError::InvalidInput("no messages".to_string()));
        }
        check_len("delays", z, pk.t.len())?;
        check_len("trapdoors", z, sk.a.len())?;
        check_len("commitments", z, sk.d.len())?;
        check_len("random bases", z, sk.r.len())?;
        check_secret_widths(&pk.aux, &sk.r, &sk.d)
    }

    /// Puzzle `i` carries `messages[i] || d[i] || r[i + 1]`; the last carries no base.
    pub(crate) fn seal_at(
        &self,
        i: usize,
        messages: &[Vec<u8>],
        pk: &GmitlpPublic,
        sk: &GmitlpSecret,
    ) -> Result<(TlpPuzzle, Digest), PuzzleError> {
        seal_puzzle(
            &self.tlp,
            self.hash.as_ref(),
            SealInput {
                n: &pk.n,
                r: &sk.r[i],
                a: &sk.a[i],
                message: &messages[i],
                d: &sk.d[i],
                next_r: sk.r.get(i + 1).map(Vec::as_slice),
            },
        )
    }
}

impl ChainedTlp for Gmitlp {
    fn setup(
        &self,
        intervals: &[u64],
        squarings_per_second: u64,
        keysize: u32,
    ) -> Result<(GmitlpPublic, GmitlpSecret), PuzzleError> {
        let z = intervals.len();
        if z < 1 {
            return Err(PuzzleError::InvalidInput(
                "a chain needs at least one interval".to_string(),
            ));
        }
        // Only the modulus, its totient and r0 are kept.
        let (base_pk, base_sk) = self.tlp.setup(1, 1, keysize)?;
        let len_r = (keysize / 8) as usize;
        let random = self.tlp.random();

        let t: Vec<Integer> = intervals
            .iter()
            .map(|interval| Integer::from(*interval) * squarings_per_second)
            .collect();
        let a = t
            .iter()
            .map(|t_i| trapdoor(t_i, &base_sk.phi_n))
            .collect::<Result<Vec<_>, _>>()?;

        let mut r = Vec::with_capacity(z);
        r.push(encode_base(&base_pk.r, len_r)?);
        for _ in 1..z {
            r.push(encode_base(&random.random_mod_n(&base_pk.n)?, len_r)?);
        }
        let d = (0..z).map(|_| random.random_bytes(COMMITMENT_LENGTH)).collect();
        log::info!("gmitlp setup: z={} keysize={}", z, keysize);

        let aux = AuxiliaryInfo {
            hash_name: self.hash.name().to_string(),
            len_commitment: COMMITMENT_LENGTH,
            len_r,
        };
        Ok((
            GmitlpPublic {
                aux,
                n: base_pk.n,
                t,
                r0: base_pk.r,
            },
            GmitlpSecret { a, r, d },
        ))
    }

    fn generate(
        &self,
        messages: &[Vec<u8>],
        pk: &GmitlpPublic,
        sk: &GmitlpSecret,
    ) -> Result<(Vec<TlpPuzzle>, Vec<Digest>), PuzzleError> {
        Self::check_inputs(messages, pk, sk)?;
        let sealed = (0..messages.len())
            .map(|i| self.seal_at(i, messages, pk, sk))
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("gmitlp generated {} puzzles", sealed.len());
        Ok(sealed.into_iter().unzip())
    }

    fn solve_with_cancellation<'a>(
        &'a self,
        pk: &'a GmitlpPublic,
        puzzles: &'a [TlpPuzzle],
        cancelled: CancellationToken,
    ) -> SolvedIter<'a> {
        if let Err(e) = check_len("puzzles", pk.t.len(), puzzles.len()) {
            return Box::new(std::iter::once(Err::<SolvedPair, _>(e)));
        }
        Box::new(SolveChain::new(
            &self.tlp,
            &pk.aux,
            &pk.n,
            &pk.r0,
            Delays::PerPuzzle(&pk.t),
            puzzles,
            cancelled,
        ))
    }

    fn verify(&self, message: &[u8], commitment: &[u8], digest: &[u8]) -> Result<(), PuzzleError> {
        verify_commitment(self.hash.as_ref(), message, commitment, digest)
    }
}
