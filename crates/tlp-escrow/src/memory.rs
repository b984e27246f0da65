use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ethereum_types::Address;
use tlp_types::{Coins, Digest, EscrowRecord, EscrowTerms, Settlement, Solution};

use crate::clock::{Clock, SystemClock};
use crate::contract::SmartContract;
use crate::state::EscrowState;
use crate::EscrowError;

/// Reference escrow held in process memory.
pub struct InMemoryContract {
    state: RwLock<EscrowState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryContract {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        InMemoryContract {
            state: RwLock::new(EscrowState::new()),
            clock,
        }
    }

    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn snapshot(&self) -> EscrowState {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, EscrowState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EscrowState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(&self, caller: Address, index: usize, settlement: Settlement) -> Result<(), EscrowError> {
        let credit = self.write().settle(caller, index, settlement)?;
        log::info!(
            "escrow {:?} index {}: credited {} to {:?}",
            settlement,
            index,
            credit.amount,
            credit.account
        );
        Ok(())
    }
}

impl SmartContract for InMemoryContract {
    fn initiate(&self, caller: Address, terms: EscrowTerms) -> Result<(), EscrowError> {
        let now = self.clock.now_millis();
        let mut state = self.write();
        let record = state.initiate(caller, terms, now)?;
        log::info!(
            "escrow initiated by {:?}: {} puzzles, helper {:?}",
            caller,
            record.terms.len(),
            record.terms.helper
        );
        Ok(())
    }

    fn record(&self) -> Result<EscrowRecord, EscrowError> {
        self.read().record().cloned()
    }

    fn set_commitments(&self, caller: Address, commitments: Vec<Digest>) -> Result<(), EscrowError> {
        let count = commitments.len();
        self.write().set_commitments(caller, commitments)?;
        log::debug!("{} commitments published", count);
        Ok(())
    }

    fn commitments(&self) -> Result<Vec<Digest>, EscrowError> {
        let state = self.read();
        state.record()?;
        Ok(state.commitments().to_vec())
    }

    fn commitment_at(&self, index: usize) -> Result<Digest, EscrowError> {
        self.read().commitment_at(index).cloned()
    }

    fn add_solution(
        &self,
        caller: Address,
        ciphertext: Vec<u8>,
        witness: Vec<u8>,
    ) -> Result<usize, EscrowError> {
        let now = self.clock.now_millis();
        let index = self.write().add_solution(caller, ciphertext, witness, now)?;
        log::debug!("solution {} registered by {:?} at {}", index, caller, now);
        Ok(index)
    }

    fn solutions(&self) -> Result<Vec<Solution>, EscrowError> {
        let state = self.read();
        state.record()?;
        Ok(state.solutions().to_vec())
    }

    fn solution_at(&self, index: usize) -> Result<Solution, EscrowError> {
        self.read().solution_at(index).cloned()
    }

    fn pay(&self, caller: Address, index: usize) -> Result<(), EscrowError> {
        self.settle(caller, index, Settlement::Paid)
    }

    fn pay_back(&self, caller: Address, index: usize) -> Result<(), EscrowError> {
        self.settle(caller, index, Settlement::PaidBack)
    }

    fn settlement_at(&self, index: usize) -> Result<Option<Settlement>, EscrowError> {
        self.read().settlement_at(index)
    }

    fn balance_of(&self, account: Address) -> Result<Coins, EscrowError> {
        Ok(self.read().balance_of(&account))
    }
}
