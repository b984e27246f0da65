use std::sync::Arc;

use rug::{Integer, Rational};
use tlp_escrow::{EscrowError, SmartContract};
use tlp_puzzle::primitives::SymmetricCipher;
use tlp_puzzle::{CancellationToken, ChainedTlp, Gctlp, Gmitlp, PuzzleError, SolvedIter};
use tlp_types::{
    Address, Coins, EscrowTerms, GmitlpPublic, GmitlpSecret, ServerInfo, Settlement, Solution,
    Timestamp, TlpPuzzle,
};

use crate::config::{DelegationConfig, EscrowRequest, custom_extra_delay};
use crate::DelegationError;

/// Symmetric key held by the client alone.
pub type ClientKey = Integer;

/// Delegated puzzle generation over GMITLP.
pub type Dgmitlp = Delegation<Gmitlp>;
/// Delegated puzzle generation over the parallel GCTLP.
pub type Edtlp = Delegation<Gctlp>;

fn ceil_millis(value: &Rational) -> Result<Timestamp, DelegationError> {
    Integer::from(value.ceil_ref())
        .to_u64()
        .ok_or_else(|| DelegationError::InvalidInput(format!("{} ms does not fit a timestamp", value)))
}

fn solution_at(contract: &dyn SmartContract, index: usize) -> Result<Solution, DelegationError> {
    contract.solution_at(index).map_err(|e| match e {
        EscrowError::NoSolution(i) => DelegationError::MissingSolution(i),
        other => other.into(),
    })
}

/// The client, server, helper and solver steps of a delegated time-lock.
///
/// The escrow is passed to every step together with the acting account,
/// so one instance can play all roles against any `SmartContract`.
pub struct Delegation<P: ChainedTlp> {
    chain: P,
    cipher: Arc<dyn SymmetricCipher>,
    config: DelegationConfig,
}

impl Delegation<Gmitlp> {
    pub fn seeded(seed: u64) -> Self {
        let chain = Gmitlp::seeded(seed);
        let cipher = chain.tlp().cipher().clone();
        Self::new(chain, cipher, DelegationConfig::get_default())
    }

    pub fn from_entropy() -> Self {
        let chain = Gmitlp::from_entropy();
        let cipher = chain.tlp().cipher().clone();
        Self::new(chain, cipher, DelegationConfig::get_default())
    }
}

impl Delegation<Gctlp> {
    pub fn seeded(seed: u64, workers: usize) -> Result<Self, DelegationError> {
        Self::over(Gmitlp::seeded(seed), workers)
    }

    pub fn from_entropy(workers: usize) -> Result<Self, DelegationError> {
        Self::over(Gmitlp::from_entropy(), workers)
    }

    fn over(inner: Gmitlp, workers: usize) -> Result<Self, DelegationError> {
        let cipher = inner.tlp().cipher().clone();
        let chain = Gctlp::new(inner, workers)?;
        Ok(Self::new(chain, cipher, DelegationConfig::get_default()))
    }
}

impl<P: ChainedTlp> Delegation<P> {
    pub fn new(chain: P, cipher: Arc<dyn SymmetricCipher>, config: DelegationConfig) -> Self {
        Delegation {
            chain,
            cipher,
            config,
        }
    }

    pub fn chain(&self) -> &P {
        &self.chain
    }

    pub fn config(&self) -> &DelegationConfig {
        &self.config
    }

    pub fn client_setup(&self) -> ClientKey {
        self.cipher.generate_key()
    }

    /// Encrypts every message under the client key. Returns the ciphertexts
    /// and the start offset that anchors the deadlines.
    pub fn client_delegation(
        &self,
        messages: &[Vec<u8>],
        key: &ClientKey,
    ) -> Result<(Vec<Vec<u8>>, Timestamp), DelegationError> {
        let ciphertexts = messages
            .iter()
            .map(|message| self.cipher.encrypt(key, message))
            .collect::<Result<Vec<_>, PuzzleError>>()?;
        log::debug!("client encrypted {} messages", ciphertexts.len());
        Ok((ciphertexts, self.config.start_delay_ms))
    }

    /// Opens the escrow with `custom_extra_delay`. Returns the extra delay of
    /// each puzzle in seconds.
    pub fn server_delegation(
        &self,
        contract: &dyn SmartContract,
        server: Address,
        request: &EscrowRequest,
    ) -> Result<Vec<Rational>, DelegationError> {
        self.server_delegation_with(contract, server, request, custom_extra_delay)
    }

    /// Opens the escrow using `extra_delay(upper_bound, seconds, server_info)`.
    ///
    /// `upper_bounds[i]` is `start_time` plus the running sum of each slot
    /// `interval + extra` in milliseconds. Every slot is rounded up on its
    /// own, so no slot is narrower than its exact width.
    pub fn server_delegation_with<F>(
        &self,
        contract: &dyn SmartContract,
        server: Address,
        request: &EscrowRequest,
        extra_delay: F,
    ) -> Result<Vec<Rational>, DelegationError>
    where
        F: Fn(u64, u64, &ServerInfo) -> Result<Rational, DelegationError>,
    {
        if request.intervals.is_empty() {
            return Err(DelegationError::InvalidInput("no intervals".to_string()));
        }
        if request.intervals.len() != request.coins.len() {
            return Err(DelegationError::InvalidInput(format!(
                "{} intervals but {} coin deposits",
                request.intervals.len(),
                request.coins.len()
            )));
        }
        let bound = request.resolved_upper_bound()?;

        let extra = request
            .intervals
            .iter()
            .map(|&seconds| extra_delay(bound, seconds, &request.server_info))
            .collect::<Result<Vec<_>, _>>()?;

        let mut cumulative = request.start_time;
        let mut upper_bounds = Vec::with_capacity(extra.len());
        let mut extra_time = Vec::with_capacity(extra.len());
        for (&seconds, delay) in request.intervals.iter().zip(&extra) {
            let delay_ms = Rational::from(delay * 1000u32);
            let slot_ms = ceil_millis(&(Rational::from(seconds) * 1000u32 + &delay_ms))?;
            cumulative = cumulative.checked_add(slot_ms).ok_or_else(|| {
                DelegationError::InvalidInput("deadline does not fit a timestamp".to_string())
            })?;
            extra_time.push(ceil_millis(&delay_ms)?);
            upper_bounds.push(cumulative);
        }

        let terms = EscrowTerms {
            coins: request.coins.clone(),
            start_time: request.start_time,
            extra_time,
            upper_bounds,
            helper: request.helper,
        };
        contract.initiate(server, terms)?;
        log::info!(
            "server {:?} escrowed {} puzzles for helper {:?} (rate bound {}/s)",
            server,
            request.intervals.len(),
            request.helper,
            bound
        );
        Ok(extra)
    }

    pub fn helper_setup(
        &self,
        intervals: &[u64],
        squarings_per_second: u64,
        keysize: u32,
    ) -> Result<(GmitlpPublic, GmitlpSecret), DelegationError> {
        Ok(self.chain.setup(intervals, squarings_per_second, keysize)?)
    }

    /// Generates the puzzles and publishes their commitments to the escrow.
    /// The puzzles go to the solver out of band.
    pub fn helper_generate(
        &self,
        contract: &dyn SmartContract,
        helper: Address,
        messages: &[Vec<u8>],
        pk: &GmitlpPublic,
        sk: &GmitlpSecret,
    ) -> Result<Vec<TlpPuzzle>, DelegationError> {
        let (puzzles, digests) = self.chain.generate(messages, pk, sk)?;
        contract.set_commitments(helper, digests)?;
        log::info!("helper {:?} published {} commitments", helper, puzzles.len());
        Ok(puzzles)
    }

    fn check_gates(
        &self,
        contract: &dyn SmartContract,
        server_info: &ServerInfo,
        pk: &GmitlpPublic,
        coins_acceptable: Coins,
    ) -> Result<(), DelegationError> {
        let coins = contract.coins()?;
        if let Some((index, &offered)) = coins
            .iter()
            .enumerate()
            .find(|(_, coin)| **coin < coins_acceptable)
        {
            log::warn!("refusing to solve: deposit {} at index {} too low", offered, index);
            return Err(DelegationError::InsufficientCoins {
                index,
                offered,
                required: coins_acceptable,
            });
        }

        let rate = server_info.squarings;
        if rate == 0 {
            return Err(DelegationError::InvalidInput(
                "claimed squaring rate is zero".to_string(),
            ));
        }
        let upper_bounds = contract.upper_bounds()?;
        if upper_bounds.len() != pk.t.len() {
            return Err(DelegationError::InvalidInput(format!(
                "{} deadlines for {} puzzles",
                upper_bounds.len(),
                pk.t.len()
            )));
        }

        let mut previous = contract.start_time()?;
        for (index, (t, &bound)) in pk.t.iter().zip(&upper_bounds).enumerate() {
            let slot_ms = bound.saturating_sub(previous);
            let needed = Rational::from((t.clone(), Integer::from(rate)));
            if needed > Rational::from((slot_ms, 1000u32)) {
                log::warn!("refusing to solve: puzzle {} cannot meet its deadline", index);
                return Err(DelegationError::DeadlineInfeasible {
                    index,
                    squarings: t.clone(),
                    rate,
                    slot_ms,
                });
            }
            previous = bound;
        }
        Ok(())
    }

    /// Checks the deposits and deadlines, then lazily solves the chain.
    ///
    /// Both checks finish before the first squaring; a refused solve does no
    /// sequential work.
    pub fn solve<'a>(
        &'a self,
        contract: &dyn SmartContract,
        server_info: &ServerInfo,
        pk: &'a GmitlpPublic,
        puzzles: &'a [TlpPuzzle],
        coins_acceptable: Coins,
    ) -> Result<SolvedIter<'a>, DelegationError> {
        self.solve_with_cancellation(
            contract,
            server_info,
            pk,
            puzzles,
            coins_acceptable,
            CancellationToken::new(),
        )
    }

    pub fn solve_with_cancellation<'a>(
        &'a self,
        contract: &dyn SmartContract,
        server_info: &ServerInfo,
        pk: &'a GmitlpPublic,
        puzzles: &'a [TlpPuzzle],
        coins_acceptable: Coins,
        cancelled: CancellationToken,
    ) -> Result<SolvedIter<'a>, DelegationError> {
        self.check_gates(contract, server_info, pk, coins_acceptable)?;
        log::debug!("gates passed, solving {} puzzles", puzzles.len());
        Ok(self.chain.solve_with_cancellation(pk, puzzles, cancelled))
    }

    /// Submits one solved ciphertext and its commitment nonce.
    pub fn register(
        &self,
        contract: &dyn SmartContract,
        solver: Address,
        solution: Vec<u8>,
        commitment: Vec<u8>,
    ) -> Result<usize, DelegationError> {
        Ok(contract.add_solution(solver, solution, commitment)?)
    }

    /// Opens commitment `index` against its registered solution and checks
    /// that the solution arrived strictly before `upper_bounds[index]`.
    pub fn verify(&self, contract: &dyn SmartContract, index: usize) -> Result<(), DelegationError> {
        let solution = solution_at(contract, index)?;
        let commitment = contract.commitment_at(index)?;
        self.chain
            .verify(&solution.ciphertext, &solution.witness, &commitment)
            .map_err(|e| match e {
                PuzzleError::CommitmentMismatch => DelegationError::CommitmentMismatch(index),
                other => other.into(),
            })?;

        let bound = contract.upper_bound_at(index)?;
        let elapsed = solution
            .timestamp
            .saturating_sub(contract.initial_timestamp()?);
        if elapsed >= bound {
            return Err(DelegationError::DeadlineMissed {
                index,
                elapsed,
                bound,
            });
        }
        Ok(())
    }

    /// Pays the solver when `verify` passes, otherwise returns the deposit
    /// to the server.
    pub fn pay(
        &self,
        contract: &dyn SmartContract,
        server: Address,
        index: usize,
    ) -> Result<Settlement, DelegationError> {
        match self.verify(contract, index) {
            Ok(()) => {
                contract.pay(server, index)?;
                Ok(Settlement::Paid)
            }
            Err(e) if e.is_verification_failure() => {
                log::warn!("paying back index {}: {}", index, e);
                contract.pay_back(server, index)?;
                Ok(Settlement::PaidBack)
            }
            Err(e) => Err(e),
        }
    }

    /// Decrypts the escrow-held ciphertext at `index` with the client key.
    pub fn retrieve(
        &self,
        contract: &dyn SmartContract,
        key: &ClientKey,
        index: usize,
    ) -> Result<Vec<u8>, DelegationError> {
        let solution = solution_at(contract, index)?;
        Ok(self.cipher.decrypt(key, &solution.ciphertext)?)
    }
}
