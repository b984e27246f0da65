use std::iter::FusedIterator;

use rug::Integer;
use tlp_types::codec::{integer_from_bytes, integer_to_fixed_bytes};
use tlp_types::{AuxiliaryInfo, Digest, GmitlpPublic, GmitlpSecret, TlpPuzzle};

use crate::PuzzleError;
use crate::primitives::HashFunction;
use crate::squaring::CancellationToken;
use crate::tlp::Tlp;

/// A solved `(message_i, d_i)` pair.
pub type SolvedPair = (Vec<u8>, Vec<u8>);

/// Lazily solves a chain in index order, one puzzle per call to `next`.
pub type SolvedIter<'a> = Box<dyn Iterator<Item = Result<SolvedPair, PuzzleError>> + Send + 'a>;

/// Distinct-interval chained puzzles. Implemented by `Gmitlp` and `Gctlp`.
pub trait ChainedTlp: Send + Sync {
    fn setup(
        &self,
        intervals: &[u64],
        squarings_per_second: u64,
        keysize: u32,
    ) -> Result<(GmitlpPublic, GmitlpSecret), PuzzleError>;

    fn generate(
        &self,
        messages: &[Vec<u8>],
        pk: &GmitlpPublic,
        sk: &GmitlpSecret,
    ) -> Result<(Vec<TlpPuzzle>, Vec<Digest>), PuzzleError>;

    fn solve_with_cancellation<'a>(
        &'a self,
        pk: &'a GmitlpPublic,
        puzzles: &'a [TlpPuzzle],
        cancelled: CancellationToken,
    ) -> SolvedIter<'a>;

    fn solve<'a>(&'a self, pk: &'a GmitlpPublic, puzzles: &'a [TlpPuzzle]) -> SolvedIter<'a> {
        self.solve_with_cancellation(pk, puzzles, CancellationToken::new())
    }

    /// Opens commitment `digest` against `message || commitment`.
    fn verify(&self, message: &[u8], commitment: &[u8], digest: &[u8]) -> Result<(), PuzzleError>;
}

pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), PuzzleError> {
    if expected != actual {
        return Err(PuzzleError::LengthMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

pub(crate) fn encode_base(r: &Integer, len_r: usize) -> Result<Vec<u8>, PuzzleError> {
    Ok(integer_to_fixed_bytes(r, len_r)?)
}

pub(crate) fn build_payload(message: &[u8], d: &[u8], next_r: Option<&[u8]>) -> Vec<u8> {
    let extra = next_r.map_or(0, <[u8]>::len);
    let mut payload = Vec::with_capacity(message.len() + d.len() + extra);
    payload.extend_from_slice(message);
    payload.extend_from_slice(d);
    if let Some(next_r) = next_r {
        payload.extend_from_slice(next_r);
    }
    payload
}

/// Splits `message || d [|| next_r]` using the fixed suffix lengths in `aux`.
pub(crate) fn split_payload<'p>(
    plaintext: &'p [u8],
    aux: &AuxiliaryInfo,
    has_next: bool,
) -> Result<(&'p [u8], &'p [u8], Option<&'p [u8]>), PuzzleError> {
    let suffix = aux.len_commitment + if has_next { aux.len_r } else { 0 };
    if plaintext.len() < suffix {
        return Err(PuzzleError::MalformedPlaintext {
            len: plaintext.len(),
            min: suffix,
        });
    }
    let (rest, next_r) = if has_next {
        let (rest, next_r) = plaintext.split_at(plaintext.len() - aux.len_r);
        (rest, Some(next_r))
    } else {
        (plaintext, None)
    };
    let (message, d) = rest.split_at(rest.len() - aux.len_commitment);
    Ok((message, d, next_r))
}

pub(crate) fn commit(hash: &dyn HashFunction, message: &[u8], d: &[u8]) -> Digest {
    let mut data = Vec::with_capacity(message.len() + d.len());
    data.extend_from_slice(message);
    data.extend_from_slice(d);
    hash.digest(&data)
}

pub(crate) fn verify_commitment(
    hash: &dyn HashFunction,
    message: &[u8],
    d: &[u8],
    digest: &[u8],
) -> Result<(), PuzzleError> {
    if commit(hash, message, d).as_slice() != digest {
        return Err(PuzzleError::CommitmentMismatch);
    }
    Ok(())
}

/// Everything needed to seal puzzle `i` of a chain.
pub(crate) struct SealInput<'a> {
    pub n: &'a Integer,
    pub r: &'a [u8],
    pub a: &'a Integer,
    pub message: &'a [u8],
    pub d: &'a [u8],
    pub next_r: Option<&'a [u8]>,
}

pub(crate) fn seal_puzzle(
    tlp: &Tlp,
    hash: &dyn HashFunction,
    input: SealInput<'_>,
) -> Result<(TlpPuzzle, Digest), PuzzleError> {
    let payload = build_payload(input.message, input.d, input.next_r);
    let base = integer_from_bytes(input.r);
    let puzzle = tlp.seal(input.n, &base, input.a, &payload)?;
    Ok((puzzle, commit(hash, input.message, input.d)))
}

pub(crate) fn check_secret_widths(
    aux: &AuxiliaryInfo,
    r: &[Vec<u8>],
    d: &[Vec<u8>],
) -> Result<(), PuzzleError> {
    for base in r {
        check_len("random base width", aux.len_r, base.len())?;
    }
    for nonce in d {
        check_len("commitment width", aux.len_commitment, nonce.len())?;
    }
    Ok(())
}

pub(crate) enum Delays<'a> {
    Shared(&'a Integer),
    PerPuzzle(&'a [Integer]),
}

/// Sequential solver over a chain. Puzzle `i + 1` needs the base recovered
/// from puzzle `i`, so there is no way to start anywhere but index 0.
pub(crate) struct SolveChain<'a> {
    tlp: &'a Tlp,
    aux: &'a AuxiliaryInfo,
    n: &'a Integer,
    delays: Delays<'a>,
    puzzles: &'a [TlpPuzzle],
    next_index: usize,
    current_r: Integer,
    cancelled: CancellationToken,
    finished: bool,
}

impl<'a> SolveChain<'a> {
    pub(crate) fn new(
        tlp: &'a Tlp,
        aux: &'a AuxiliaryInfo,
        n: &'a Integer,
        r0: &Integer,
        delays: Delays<'a>,
        puzzles: &'a [TlpPuzzle],
        cancelled: CancellationToken,
    ) -> Self {
        SolveChain {
            tlp,
            aux,
            n,
            delays,
            puzzles,
            next_index: 0,
            current_r: r0.clone(),
            cancelled,
            finished: false,
        }
    }

    fn delay(&self, index: usize) -> Result<&'a Integer, PuzzleError> {
        match self.delays {
            Delays::Shared(t) => Ok(t),
            Delays::PerPuzzle(ts) => ts.get(index).ok_or(PuzzleError::LengthMismatch {
                what: "delays",
                expected: self.puzzles.len(),
                actual: ts.len(),
            }),
        }
    }

    fn step(&mut self, index: usize) -> Result<SolvedPair, PuzzleError> {
        let t = self.delay(index)?;
        let plaintext = self.tlp.unlock(
            self.n,
            t,
            &self.current_r,
            &self.puzzles[index],
            &self.cancelled,
        )?;
        let has_next = index + 1 < self.puzzles.len();
        let (message, d, next_r) = split_payload(&plaintext, self.aux, has_next)?;
        if let Some(next_r) = next_r {
            self.current_r = integer_from_bytes(next_r);
        }
        log::debug!("solved puzzle {} of {}", index + 1, self.puzzles.len());
        Ok((message.to_vec(), d.to_vec()))
    }
}

impl Iterator for SolveChain<'_> {
    type Item = Result<SolvedPair, PuzzleError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.next_index >= self.puzzles.len() {
            return None;
        }
        let index = self.next_index;
        match self.step(index) {
            Ok(pair) => {
                self.next_index += 1;
                Some(Ok(pair))
            }
            Err(e) => {
                // The base for the rest of the chain is lost.
                self.finished = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            return (0, Some(0));
        }
        let remaining = self.puzzles.len() - self.next_index;
        (0, Some(remaining))
    }
}

impl FusedIterator for SolveChain<'_> {}
