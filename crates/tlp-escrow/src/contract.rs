use ethereum_types::Address;
use tlp_types::{Coins, Digest, EscrowRecord, EscrowTerms, Settlement, Solution, Timestamp};

use crate::EscrowError;

/// Commitments are submitted in chunks of this many digests.
pub const COMMITMENT_BATCH_SIZE: usize = 250;

/// Splits a commitment list into submission batches, preserving order.
pub fn commitment_batches(commitments: &[Digest]) -> std::slice::Chunks<'_, Digest> {
    commitments.chunks(COMMITMENT_BATCH_SIZE)
}

/// The escrow collaborator of the delegation protocol.
///
/// Mutating calls take the acting account explicitly. Every implementation
/// enforces the same rules:
/// - only the registered helper publishes commitments, exactly once;
/// - solutions are appended in index order, never before
///   `initial_timestamp + start_time` and never beyond the commitments;
/// - only the initiating server pays or pays back, once per index.
pub trait SmartContract: Send + Sync {
    fn initiate(&self, caller: Address, terms: EscrowTerms) -> Result<(), EscrowError>;

    fn record(&self) -> Result<EscrowRecord, EscrowError>;

    fn server(&self) -> Result<Address, EscrowError> {
        Ok(self.record()?.server)
    }

    fn helper(&self) -> Result<Address, EscrowError> {
        Ok(self.record()?.terms.helper)
    }

    fn coins(&self) -> Result<Vec<Coins>, EscrowError> {
        Ok(self.record()?.terms.coins)
    }

    fn start_time(&self) -> Result<Timestamp, EscrowError> {
        Ok(self.record()?.terms.start_time)
    }

    fn extra_time(&self) -> Result<Vec<Timestamp>, EscrowError> {
        Ok(self.record()?.terms.extra_time)
    }

    fn upper_bounds(&self) -> Result<Vec<Timestamp>, EscrowError> {
        Ok(self.record()?.terms.upper_bounds)
    }

    fn upper_bound_at(&self, index: usize) -> Result<Timestamp, EscrowError> {
        let bounds = self.upper_bounds()?;
        bounds
            .get(index)
            .copied()
            .ok_or(EscrowError::IndexOutOfRange {
                index,
                len: bounds.len(),
            })
    }

    fn initial_timestamp(&self) -> Result<Timestamp, EscrowError> {
        Ok(self.record()?.initial_timestamp)
    }

    fn set_commitments(&self, caller: Address, commitments: Vec<Digest>) -> Result<(), EscrowError>;

    fn commitments(&self) -> Result<Vec<Digest>, EscrowError>;

    fn commitment_at(&self, index: usize) -> Result<Digest, EscrowError>;

    /// Registers the next solution and returns its index.
    fn add_solution(
        &self,
        caller: Address,
        ciphertext: Vec<u8>,
        witness: Vec<u8>,
    ) -> Result<usize, EscrowError>;

    fn solutions(&self) -> Result<Vec<Solution>, EscrowError>;

    fn solution_at(&self, index: usize) -> Result<Solution, EscrowError>;

    /// A registered, non-empty solution exists at `index`.
    fn verify_solution(&self, index: usize) -> bool {
        self.solution_at(index)
            .map(|solution| !solution.ciphertext.is_empty())
            .unwrap_or(false)
    }

    fn pay(&self, caller: Address, index: usize) -> Result<(), EscrowError>;

    fn pay_back(&self, caller: Address, index: usize) -> Result<(), EscrowError>;

    fn settlement_at(&self, index: usize) -> Result<Option<Settlement>, EscrowError>;

    fn balance_of(&self, account: Address) -> Result<Coins, EscrowError>;
}
