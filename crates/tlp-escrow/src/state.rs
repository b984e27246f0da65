use std::collections::BTreeMap;

use ethereum_types::Address;
use tlp_types::{Coins, Digest, EscrowRecord, EscrowTerms, Settlement, Solution, Timestamp};

use crate::EscrowError;

/// The full escrow ledger and the rules every backend enforces on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EscrowState {
    record: Option<EscrowRecord>,
    commitments: Vec<Digest>,
    solutions: Vec<Solution>,
    settlements: Vec<Option<Settlement>>,
    balances: BTreeMap<Address, Coins>,
}

/// A balance change produced by settling one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credit {
    pub account: Address,
    pub amount: Coins,
    pub balance: Coins,
}

impl EscrowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a state from persisted parts.
    pub fn restore(
        record: Option<EscrowRecord>,
        commitments: Vec<Digest>,
        solutions: Vec<Solution>,
        settlements: Vec<Option<Settlement>>,
        balances: BTreeMap<Address, Coins>,
    ) -> Self {
        EscrowState {
            record,
            commitments,
            solutions,
            settlements,
            balances,
        }
    }

    pub fn record(&self) -> Result<&EscrowRecord, EscrowError> {
        self.record.as_ref().ok_or(EscrowError::NotInitiated)
    }

    pub fn terms(&self) -> Result<&EscrowTerms, EscrowError> {
        Ok(&self.record()?.terms)
    }

    fn check_index(&self, index: usize) -> Result<(), EscrowError> {
        let len = self.terms()?.len();
        if index >= len {
            return Err(EscrowError::IndexOutOfRange { index, len });
        }
        Ok(())
    }

    pub fn initiate(
        &mut self,
        caller: Address,
        terms: EscrowTerms,
        now: Timestamp,
    ) -> Result<&EscrowRecord, EscrowError> {
        if self.record.is_some() {
            return Err(EscrowError::AlreadyInitiated);
        }
        terms.validate()?;
        self.settlements = vec![None; terms.len()];
        Ok(self.record.insert(EscrowRecord {
            terms,
            server: caller,
            initial_timestamp: now,
        }))
    }

    /// Only the helper, only once, one digest per escrowed puzzle.
    pub fn set_commitments(
        &mut self,
        caller: Address,
        commitments: Vec<Digest>,
    ) -> Result<(), EscrowError> {
        let terms = self.terms()?;
        if caller != terms.helper {
            return Err(EscrowError::Unauthorized {
                caller,
                action: "publish commitments",
            });
        }
        if !self.commitments.is_empty() {
            return Err(EscrowError::CommitmentsAlreadySet);
        }
        if commitments.len() != terms.len() {
            return Err(EscrowError::CommitmentCountMismatch {
                expected: terms.len(),
                actual: commitments.len(),
            });
        }
        self.commitments = commitments;
        Ok(())
    }

    /// Appends the next solution in index order and returns its index.
    pub fn add_solution(
        &mut self,
        caller: Address,
        ciphertext: Vec<u8>,
        witness: Vec<u8>,
        now: Timestamp,
    ) -> Result<usize, EscrowError> {
        let record = self.record()?;
        let start = record
            .initial_timestamp
            .saturating_add(record.terms.start_time);
        if now < start {
            return Err(EscrowError::NotStarted { now, start });
        }
        if self.solutions.len() >= self.commitments.len() {
            return Err(EscrowError::TooManySolutions);
        }
        self.solutions.push(Solution {
            ciphertext,
            witness,
            timestamp: now,
            solver: caller,
        });
        Ok(self.solutions.len() - 1)
    }

    /// Releases the deposit at `index`: to its solver when paid, to the server when paid back.
    pub fn settle(
        &mut self,
        caller: Address,
        index: usize,
        settlement: Settlement,
    ) -> Result<Credit, EscrowError> {
        let record = self.record()?;
        if caller != record.server {
            return Err(EscrowError::Unauthorized {
                caller,
                action: match settlement {
                    Settlement::Paid => "pay",
                    Settlement::PaidBack => "pay back",
                },
            });
        }
        self.check_index(index)?;
        if self.settlements.get(index).copied().flatten().is_some() {
            return Err(EscrowError::AlreadySettled(index));
        }

        let amount = record.terms.coins[index];
        let account = match settlement {
            Settlement::Paid => {
                self.solutions
                    .get(index)
                    .ok_or(EscrowError::NoSolution(index))?
                    .solver
            }
            Settlement::PaidBack => record.server,
        };

        if self.settlements.len() <= index {
            self.settlements.resize(index + 1, None);
        }
        self.settlements[index] = Some(settlement);
        let balance = self.balances.entry(account).or_default();
        *balance = balance.saturating_add(amount);
        Ok(Credit {
            account,
            amount,
            balance: *balance,
        })
    }

    pub fn commitments(&self) -> &[Digest] {
        &self.commitments
    }

    pub fn commitment_at(&self, index: usize) -> Result<&Digest, EscrowError> {
        self.check_index(index)?;
        self.commitments.get(index).ok_or(EscrowError::IndexOutOfRange {
            index,
            len: self.commitments.len(),
        })
    }

    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    pub fn solution_at(&self, index: usize) -> Result<&Solution, EscrowError> {
        self.check_index(index)?;
        self.solutions.get(index).ok_or(EscrowError::NoSolution(index))
    }

    pub fn settlement_at(&self, index: usize) -> Result<Option<Settlement>, EscrowError> {
        self.check_index(index)?;
        Ok(self.settlements.get(index).copied().flatten())
    }

    pub fn settlements(&self) -> &[Option<Settlement>] {
        &self.settlements
    }

    pub fn balance_of(&self, account: &Address) -> Coins {
        self.balances.get(account).copied().unwrap_or_default()
    }

    pub fn balances(&self) -> &BTreeMap<Address, Coins> {
        &self.balances
    }
}
