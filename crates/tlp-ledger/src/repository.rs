use anyhow::Result;
use ethereum_types::Address;
use std::collections::BTreeMap;
use std::sync::Arc;
use tlp_escrow::{Credit, EscrowState, commitment_batches};
use tlp_types::{Coins, Digest, EscrowRecord, Settlement, Solution, TypesError};

use crate::db::{DbReader, DbWriter, WriteOp};
use crate::{Column, LedgerError};

/// Key of the single escrow record in the terms column.
pub const RECORD_KEY: &[u8] = b"record";

fn index_key(index: usize) -> [u8; 8] {
    (index as u64).to_be_bytes()
}

fn parse_index(col: Column, key: &[u8]) -> Result<usize> {
    let bytes: [u8; 8] = key.try_into().map_err(|_| {
        LedgerError::Corrupt(format!("{} key has length {}", col.name(), key.len()))
    })?;
    Ok(u64::from_be_bytes(bytes) as usize)
}

/// Reads and writes the escrow ledger columns.
///
/// Indexed columns are keyed by big-endian puzzle index so that a forward
/// scan returns entries in index order.
pub struct EscrowRepository<D: DbReader + DbWriter> {
    db: Arc<D>,
}

impl<D: DbReader + DbWriter> EscrowRepository<D> {
    pub fn new(db: Arc<D>) -> Self {
        EscrowRepository { db }
    }

    pub fn record(&self) -> Result<Option<EscrowRecord>> {
        match self.db.get(Column::Terms, RECORD_KEY)? {
            Some(value) => Ok(Some(EscrowRecord::from_rlp_bytes(value.as_ref())?)),
            None => Ok(None),
        }
    }

    /// Values of an indexed column, checked to be dense from zero.
    fn indexed_values(&self, col: Column) -> Result<Vec<Box<[u8]>>> {
        let mut values = Vec::new();
        for item in self.db.iter(col) {
            let (key, value) = item?;
            let index = parse_index(col, &key)?;
            if index != values.len() {
                return Err(LedgerError::Corrupt(format!(
                    "{} has a gap before index {}",
                    col.name(),
                    index
                ))
                .into());
            }
            values.push(value);
        }
        Ok(values)
    }

    pub fn commitments(&self) -> Result<Vec<Digest>> {
        Ok(self
            .indexed_values(Column::Commitments)?
            .into_iter()
            .map(Vec::from)
            .collect())
    }

    pub fn solutions(&self) -> Result<Vec<Solution>> {
        self.indexed_values(Column::Solutions)?
            .iter()
            .map(|value| {
                rlp::decode::<Solution>(value)
                    .map_err(|e| anyhow::Error::from(LedgerError::Types(e.into())))
            })
            .collect()
    }

    /// Settlements laid out over `len` puzzle indices.
    pub fn settlements(&self, len: usize) -> Result<Vec<Option<Settlement>>> {
        let mut settlements = vec![None; len];
        for item in self.db.iter(Column::Settlements) {
            let (key, value) = item?;
            let index = parse_index(Column::Settlements, &key)?;
            let settlement = match value.as_ref() {
                [byte] => Settlement::from_u8(*byte),
                _ => None,
            }
            .ok_or_else(|| LedgerError::Corrupt(format!("settlement {} is unreadable", index)))?;
            let slot = settlements.get_mut(index).ok_or_else(|| {
                LedgerError::Corrupt(format!("settlement index {} beyond {} puzzles", index, len))
            })?;
            *slot = Some(settlement);
        }
        Ok(settlements)
    }

    pub fn balances(&self) -> Result<BTreeMap<Address, Coins>> {
        let mut balances = BTreeMap::new();
        for item in self.db.iter(Column::Balances) {
            let (key, value) = item?;
            if key.len() != Address::len_bytes() {
                return Err(LedgerError::Corrupt(format!(
                    "balance key has length {}",
                    key.len()
                ))
                .into());
            }
            let amount: Coins =
                rlp::decode(&value).map_err(|e| LedgerError::Types(TypesError::from(e)))?;
            balances.insert(Address::from_slice(&key), amount);
        }
        Ok(balances)
    }

    /// Rebuilds the whole escrow state from disk.
    ///
    /// A commitment list shorter than the terms is the remains of an
    /// interrupted chunked write. It is dropped so the helper can publish
    /// again; the next write overwrites the same keys.
    pub fn load_state(&self) -> Result<EscrowState> {
        let record = self.record()?;
        let len = record.as_ref().map_or(0, |record| record.terms.len());
        let mut commitments = self.commitments()?;
        if !commitments.is_empty() && commitments.len() != len {
            log::warn!(
                "dropping {} of {} commitments left by an interrupted write",
                commitments.len(),
                len
            );
            commitments.clear();
        }
        let state = EscrowState::restore(
            record,
            commitments,
            self.solutions()?,
            self.settlements(len)?,
            self.balances()?,
        );
        log::debug!(
            "loaded escrow state: {} commitments, {} solutions",
            state.commitments().len(),
            state.solutions().len()
        );
        Ok(state)
    }

    pub fn write_record(&self, record: &EscrowRecord) -> Result<()> {
        self.db
            .write(&[WriteOp::put(Column::Terms, RECORD_KEY, record.to_rlp_bytes())])
    }

    /// Writes commitments one batch per submission chunk.
    pub fn write_commitments(&self, commitments: &[Digest]) -> Result<()> {
        let mut offset = 0;
        for batch in commitment_batches(commitments) {
            let ops: Vec<WriteOp> = batch
                .iter()
                .enumerate()
                .map(|(i, digest)| {
                    WriteOp::put(Column::Commitments, index_key(offset + i), digest.clone())
                })
                .collect();
            self.db.write(&ops)?;
            offset += batch.len();
        }
        Ok(())
    }

    pub fn write_solution(&self, index: usize, solution: &Solution) -> Result<()> {
        self.db.write(&[WriteOp::put(
            Column::Solutions,
            index_key(index),
            rlp::encode(solution).to_vec(),
        )])
    }

    /// Records a settlement and the balance it credits atomically.
    pub fn write_settlement(
        &self,
        index: usize,
        settlement: Settlement,
        credit: &Credit,
    ) -> Result<()> {
        self.db.write(&[
            WriteOp::put(Column::Settlements, index_key(index), vec![settlement.as_u8()]),
            WriteOp::put(
                Column::Balances,
                credit.account.as_bytes(),
                rlp::encode(&credit.balance).to_vec(),
            ),
        ])
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::{DbIterator, IteratorItem};
    use std::collections::HashMap;
    use std::sync::RwLock;
    use tlp_types::{EscrowTerms, U256};

    // In-memory mock implementation
    #[derive(Default)]
    pub(crate) struct MockLedgerStore {
        data: RwLock<HashMap<String, BTreeMap<Vec<u8>, Vec<u8>>>>,
    }

    impl MockLedgerStore {
        pub(crate) fn put(&self, col: Column, key: &[u8], value: &[u8]) {
            let mut data = self.data.write().unwrap();
            let cf = data.entry(col.name().to_string()).or_default();
            cf.insert(key.to_vec(), value.to_vec());
        }

        pub(crate) fn count(&self, col: Column) -> usize {
            let data = self.data.read().unwrap();
            data.get(col.name()).map_or(0, BTreeMap::len)
        }
    }

    impl DbReader for MockLedgerStore {
        type Slice<'a> = Vec<u8>;

        fn get<'a>(&'a self, col: Column, key: &[u8]) -> Result<Option<Self::Slice<'a>>> {
            let data = self.data.read().unwrap();
            if let Some(cf) = data.get(col.name()) {
                Ok(cf.get(key).cloned())
            } else {
                Ok(None)
            }
        }

        fn iter<'a>(&'a self, col: Column) -> DbIterator<'a> {
            let data = self.data.read().unwrap();
            let entries: Vec<IteratorItem> = data
                .get(col.name())
                .map(|cf| {
                    cf.iter()
                        .map(|(k, v)| {
                            Ok((k.clone().into_boxed_slice(), v.clone().into_boxed_slice()))
                        })
                        .collect()
                })
                .unwrap_or_default();
            Box::new(entries.into_iter())
        }
    }

    impl DbWriter for MockLedgerStore {
        fn write(&self, ops: &[WriteOp]) -> Result<()> {
            for op in ops {
                self.put(op.col, &op.key, &op.value);
            }
            Ok(())
        }
    }

    const SERVER: Address = Address::repeat_byte(0x0a);
    const HELPER: Address = Address::repeat_byte(0x0b);

    fn record() -> EscrowRecord {
        EscrowRecord {
            terms: EscrowTerms {
                coins: vec![U256::from(3), U256::from(4)],
                start_time: 0,
                extra_time: vec![0, 0],
                upper_bounds: vec![500, 900],
                helper: HELPER,
            },
            server: SERVER,
            initial_timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_empty_store_loads_default_state() {
        let repo = EscrowRepository::new(Arc::new(MockLedgerStore::default()));
        assert_eq!(repo.load_state().unwrap(), EscrowState::new());
    }

    #[test]
    fn test_written_state_reloads() {
        let db = Arc::new(MockLedgerStore::default());
        let repo = EscrowRepository::new(db.clone());

        let mut state = EscrowState::new();
        let record = state.initiate(SERVER, record().terms, 77).unwrap().clone();
        repo.write_record(&record).unwrap();

        let commitments = vec![vec![1u8; 64], vec![2u8; 64]];
        state.set_commitments(HELPER, commitments.clone()).unwrap();
        repo.write_commitments(&commitments).unwrap();

        let index = state.add_solution(SERVER, b"ct".to_vec(), b"w".to_vec(), 100).unwrap();
        repo.write_solution(index, &state.solutions()[index]).unwrap();

        let credit = state.settle(SERVER, 1, Settlement::PaidBack).unwrap();
        repo.write_settlement(1, Settlement::PaidBack, &credit).unwrap();

        assert_eq!(repo.load_state().unwrap(), state);
        assert_eq!(db.count(Column::Commitments), 2);
        assert_eq!(db.count(Column::Balances), 1);
    }

    #[test]
    fn test_commitments_kept_in_index_order() {
        let db = Arc::new(MockLedgerStore::default());
        let repo = EscrowRepository::new(db.clone());
        let commitments: Vec<Digest> = (0..600u32).map(|i| i.to_le_bytes().to_vec()).collect();
        repo.write_commitments(&commitments).unwrap();
        assert_eq!(repo.commitments().unwrap(), commitments);
    }

    #[test]
    fn test_partial_commitments_dropped_on_load() {
        let db = Arc::new(MockLedgerStore::default());
        let repo = EscrowRepository::new(db.clone());
        repo.write_record(&record()).unwrap();
        repo.write_commitments(&[vec![1u8; 64]]).unwrap();
        assert!(repo.load_state().unwrap().commitments().is_empty());

        repo.write_commitments(&[vec![1u8; 64], vec![2u8; 64]]).unwrap();
        assert_eq!(repo.load_state().unwrap().commitments().len(), 2);
    }

    #[test]
    fn test_gap_in_solutions_is_corrupt() {
        let db = Arc::new(MockLedgerStore::default());
        db.put(Column::Solutions, &5u64.to_be_bytes(), &[0xc0]);
        let repo = EscrowRepository::new(db);
        let err = repo.solutions().unwrap_err();
        assert!(err.to_string().contains("gap before index 5"));
    }

    #[test]
    fn test_unknown_settlement_byte_is_corrupt() {
        let db = Arc::new(MockLedgerStore::default());
        db.put(Column::Terms, RECORD_KEY, &record().to_rlp_bytes());
        db.put(Column::Settlements, &0u64.to_be_bytes(), &[9]);
        let repo = EscrowRepository::new(db);
        assert!(repo.load_state().is_err());
    }

    #[test]
    fn test_malformed_record_fails() {
        let db = Arc::new(MockLedgerStore::default());
        db.put(Column::Terms, RECORD_KEY, &[0x01, 0x02]);
        let repo = EscrowRepository::new(db);
        assert!(repo.record().is_err());
    }
}
