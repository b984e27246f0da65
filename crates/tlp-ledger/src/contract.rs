use anyhow::Result;
use ethereum_types::Address;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tlp_escrow::{Clock, EscrowError, EscrowState, SmartContract};
use tlp_types::{Coins, Digest, EscrowRecord, EscrowTerms, Settlement, Solution};

use crate::db::{DbReader, DbWriter, Storage};
use crate::repository::EscrowRepository;
use crate::LedgerConfig;

fn backend(err: anyhow::Error) -> EscrowError {
    EscrowError::Backend(format!("{:#}", err))
}

/// Escrow contract whose state survives restarts in RocksDB.
///
/// Every mutation is checked against a copy of the cached state, persisted,
/// and only then made visible. A failed write leaves the cache untouched.
pub struct LedgerContract<D: DbReader + DbWriter = Storage> {
    repo: EscrowRepository<D>,
    state: RwLock<EscrowState>,
    clock: Arc<dyn Clock>,
}

impl LedgerContract<Storage> {
    /// Opens (or creates) the ledger at `config.db_path` and restores its state.
    pub fn open(config: LedgerConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let storage = Storage::new(config)?;
        Self::with_store(Arc::new(storage), clock)
    }
}

impl<D: DbReader + DbWriter> LedgerContract<D> {
    pub fn with_store(db: Arc<D>, clock: Arc<dyn Clock>) -> Result<Self> {
        let repo = EscrowRepository::new(db);
        let state = repo.load_state()?;
        Ok(LedgerContract {
            repo,
            state: RwLock::new(state),
            clock,
        })
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

    /// Applies `apply` to a staged copy, runs `persist`, then commits the copy.
    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut EscrowState) -> Result<T, EscrowError>,
        persist: impl FnOnce(&EscrowRepository<D>, &EscrowState, &T) -> Result<()>,
    ) -> Result<T, EscrowError> {
        let mut guard = self.write();
        let mut staged = guard.clone();
        let out = apply(&mut staged)?;
        persist(&self.repo, &staged, &out).map_err(backend)?;
        *guard = staged;
        Ok(out)
    }

    fn settle(&self, caller: Address, index: usize, settlement: Settlement) -> Result<(), EscrowError> {
        let credit = self.mutate(
            |state| state.settle(caller, index, settlement),
            |repo, _, credit| repo.write_settlement(index, settlement, credit),
        )?;
        log::info!(
            "ledger {:?} index {}: credited {} to {:?}",
            settlement,
            index,
            credit.amount,
            credit.account
        );
        Ok(())
    }
}

impl<D: DbReader + DbWriter> SmartContract for LedgerContract<D> {
    fn initiate(&self, caller: Address, terms: EscrowTerms) -> Result<(), EscrowError> {
        let now = self.clock.now_millis();
        let record = self.mutate(
            |state| state.initiate(caller, terms, now).cloned(),
            |repo, _, record| repo.write_record(record),
        )?;
        log::info!(
            "ledger escrow initiated by {:?}: {} puzzles",
            caller,
            record.terms.len()
        );
        Ok(())
    }

    fn record(&self) -> Result<EscrowRecord, EscrowError> {
        self.read().record().cloned()
    }

    fn set_commitments(&self, caller: Address, commitments: Vec<Digest>) -> Result<(), EscrowError> {
        self.mutate(
            |state| state.set_commitments(caller, commitments),
            |repo, state, _| repo.write_commitments(state.commitments()),
        )
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
        let index = self.mutate(
            |state| state.add_solution(caller, ciphertext, witness, now),
            |repo, state, &index| repo.write_solution(index, &state.solutions()[index]),
        )?;
        log::debug!("ledger solution {} stored at {}", index, now);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::WriteOp;
    use crate::repository::tests::MockLedgerStore;
    use crate::Column;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tlp_escrow::ManualClock;
    use tlp_types::U256;

    const SERVER: Address = Address::repeat_byte(0x21);
    const HELPER: Address = Address::repeat_byte(0x22);
    const SOLVER: Address = Address::repeat_byte(0x23);

    fn terms() -> EscrowTerms {
        EscrowTerms {
            coins: vec![U256::from(10), U256::from(20)],
            start_time: 0,
            extra_time: vec![0, 0],
            upper_bounds: vec![1_000, 2_000],
            helper: HELPER,
        }
    }

    /// Store whose writes can be switched off, now or after a number of writes.
    #[derive(Default)]
    struct FlakyStore {
        inner: MockLedgerStore,
        fail: AtomicBool,
        writes_left: Mutex<Option<usize>>,
    }

    impl DbReader for FlakyStore {
        type Slice<'a> = Vec<u8>;

        fn get<'a>(&'a self, col: Column, key: &[u8]) -> Result<Option<Self::Slice<'a>>> {
            self.inner.get(col, key)
        }

        fn iter<'a>(&'a self, col: Column) -> crate::db::DbIterator<'a> {
            self.inner.iter(col)
        }
    }

    impl DbWriter for FlakyStore {
        fn write(&self, ops: &[WriteOp]) -> Result<()> {
            if let Some(left) = self.writes_left.lock().unwrap().as_mut() {
                if *left == 0 {
                    self.fail.store(true, Ordering::SeqCst);
                } else {
                    *left -= 1;
                }
            }
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("disk full");
            }
            self.inner.write(ops)
        }
    }

    #[test]
    fn test_state_survives_reopen() {
        let db = Arc::new(MockLedgerStore::default());
        let clock = Arc::new(ManualClock::new(5_000));
        let contract = LedgerContract::with_store(db.clone(), clock.clone()).unwrap();
        contract.initiate(SERVER, terms()).unwrap();
        contract
            .set_commitments(HELPER, vec![vec![7; 64], vec![8; 64]])
            .unwrap();
        clock.advance(300);
        contract.add_solution(SOLVER, b"c0".to_vec(), b"d0".to_vec()).unwrap();
        contract.pay(SERVER, 0).unwrap();

        let reopened = LedgerContract::with_store(db, clock).unwrap();
        assert_eq!(reopened.snapshot(), contract.snapshot());
        assert_eq!(reopened.solution_at(0).unwrap().timestamp, 5_300);
        assert_eq!(reopened.balance_of(SOLVER).unwrap(), U256::from(10));
        assert_eq!(reopened.settlement_at(0).unwrap(), Some(Settlement::Paid));
    }

    #[test]
    fn test_rule_violation_writes_nothing() {
        let db = Arc::new(MockLedgerStore::default());
        let contract = LedgerContract::with_store(db.clone(), Arc::new(ManualClock::new(0))).unwrap();
        contract.initiate(SERVER, terms()).unwrap();
        assert!(contract.set_commitments(SOLVER, vec![vec![1], vec![2]]).is_err());
        assert_eq!(db.count(Column::Commitments), 0);
    }

    #[test]
    fn test_failed_write_keeps_cached_state() {
        let db = Arc::new(FlakyStore::default());
        let contract = LedgerContract::with_store(db.clone(), Arc::new(ManualClock::new(0))).unwrap();
        contract.initiate(SERVER, terms()).unwrap();
        contract.set_commitments(HELPER, vec![vec![1], vec![2]]).unwrap();

        db.fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            contract.add_solution(SOLVER, vec![1], vec![]),
            Err(EscrowError::Backend(msg)) if msg.contains("disk full")
        ));
        assert!(contract.solutions().unwrap().is_empty());

        db.fail.store(false, Ordering::SeqCst);
        assert_eq!(contract.add_solution(SOLVER, vec![1], vec![]).unwrap(), 0);
    }

    #[test]
    fn test_interrupted_commitment_write_can_be_retried() {
        let puzzles = 600;
        let terms = EscrowTerms {
            coins: vec![U256::one(); puzzles],
            start_time: 0,
            extra_time: vec![0; puzzles],
            upper_bounds: (1..=puzzles as u64).map(|i| i * 1_000).collect(),
            helper: HELPER,
        };
        let commitments: Vec<Digest> = (0..puzzles as u32).map(|i| i.to_be_bytes().to_vec()).collect();
        let db = Arc::new(FlakyStore::default());
        let clock = Arc::new(ManualClock::new(0));
        let contract = LedgerContract::with_store(db.clone(), clock.clone()).unwrap();
        contract.initiate(SERVER, terms).unwrap();

        // The first batch lands, the second fails.
        *db.writes_left.lock().unwrap() = Some(1);
        assert!(matches!(
            contract.set_commitments(HELPER, commitments.clone()),
            Err(EscrowError::Backend(_))
        ));
        assert_eq!(db.inner.count(Column::Commitments), 250);
        assert!(contract.commitments().unwrap().is_empty());

        *db.writes_left.lock().unwrap() = None;
        db.fail.store(false, Ordering::SeqCst);
        let reopened = LedgerContract::with_store(db.clone(), clock.clone()).unwrap();
        assert!(reopened.commitments().unwrap().is_empty());

        reopened.set_commitments(HELPER, commitments.clone()).unwrap();
        let reopened = LedgerContract::with_store(db, clock).unwrap();
        assert_eq!(reopened.commitments().unwrap(), commitments);
        assert_eq!(reopened.add_solution(SOLVER, vec![1], vec![]).unwrap(), 0);
    }
}
