use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tlp_types::{Digest, GmitlpPublic, GmitlpSecret, TlpPuzzle};

use crate::PuzzleError;
use crate::chain::{ChainedTlp, SolvedIter};
use crate::config::DEFAULT_WORKERS;
use crate::gmitlp::Gmitlp;
use crate::squaring::CancellationToken;

/// GMITLP with puzzle generation spread over a fixed worker pool.
/// Solving stays sequential.
pub struct Gctlp {
    inner: Gmitlp,
    pool: ThreadPool,
    workers: usize,
}

impl Gctlp {
    pub fn new(inner: Gmitlp, workers: usize) -> Result<Self, PuzzleError> {
        if workers == 0 {
            return Err(PuzzleError::InvalidInput(
                "worker pool needs at least one thread".to_string(),
            ));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("gctlp-worker-{}", i))
            .build()
            .map_err(|e| PuzzleError::WorkerPool(e.to_string()))?;
        Ok(Gctlp {
            inner,
            pool,
            workers,
        })
    }

    pub fn with_default_workers(inner: Gmitlp) -> Result<Self, PuzzleError> {
        Self::new(inner, DEFAULT_WORKERS)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn inner(&self) -> &Gmitlp {
        &self.inner
    }
}

impl ChainedTlp for Gctlp {
    fn setup(
        &self,
        intervals: &[u64],
        squarings_per_second: u64,
        keysize: u32,
    ) -> Result<(GmitlpPublic, GmitlpSecret), PuzzleError> {
        self.inner.setup(intervals, squarings_per_second, keysize)
    }

    fn generate(
        &self,
        messages: &[Vec<u8>],
        pk: &GmitlpPublic,
        sk: &GmitlpSecret,
    ) -> Result<(Vec<TlpPuzzle>, Vec<Digest>), PuzzleError> {
        Gmitlp::check_inputs(messages, pk, sk)?;
        let sealed = self.pool.install(|| {
            (0..messages.len())
                .into_par_iter()
                .map(|i| self.inner.seal_at(i, messages, pk, sk))
                .collect::<Result<Vec<_>, _>>()
        })?;
        log::debug!(
            "gctlp generated {} puzzles on {} workers",
            sealed.len(),
            self.workers
        );
        Ok(sealed.into_iter().unzip())
    }

    fn solve_with_cancellation<'a>(
        &'a self,
        pk: &'a GmitlpPublic,
        puzzles: &'a [TlpPuzzle],
        cancelled: CancellationToken,
    ) -> SolvedIter<'a> {
        self.inner.solve_with_cancellation(pk, puzzles, cancelled)
    }

    fn verify(&self, message: &[u8], commitment: &[u8], digest: &[u8]) -> Result<(), PuzzleError> {
        self.inner.verify(message, commitment, digest)
    }
}
