use std::sync::Arc;

use ethereum_types::Address;
use tlp_escrow::{EscrowError, ManualClock, SmartContract};
use tlp_ledger::{Column, DbReader, LedgerConfig, LedgerContract, RECORD_KEY, Storage};
use tlp_types::{EscrowRecord, EscrowTerms, Settlement, U256};

const SERVER: Address = Address::repeat_byte(0x31);
const HELPER: Address = Address::repeat_byte(0x32);
const SOLVER: Address = Address::repeat_byte(0x33);

fn terms(len: usize) -> EscrowTerms {
    EscrowTerms {
        coins: vec![U256::from(2); len],
        start_time: 100,
        extra_time: vec![0; len],
        upper_bounds: (1..=len as u64).map(|i| 100 + i * 1_000).collect(),
        helper: HELPER,
    }
}

#[test]
fn test_ledger_reopens_with_full_state() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(1_000));
    let len = 300;

    {
        let contract = LedgerContract::open(LedgerConfig::new(dir.path().to_path_buf()), clock.clone())
            .unwrap();
        contract.initiate(SERVER, terms(len)).unwrap();
        let commitments: Vec<Vec<u8>> = (0..len as u16).map(|i| i.to_be_bytes().to_vec()).collect();
        contract.set_commitments(HELPER, commitments).unwrap();
        clock.advance(150);
        contract.add_solution(SOLVER, b"first".to_vec(), b"w0".to_vec()).unwrap();
        clock.advance(10);
        contract.add_solution(SOLVER, b"second".to_vec(), b"w1".to_vec()).unwrap();
        contract.pay(SERVER, 0).unwrap();
        contract.pay_back(SERVER, 1).unwrap();
    }

    let contract =
        LedgerContract::open(LedgerConfig::new(dir.path().to_path_buf()), clock).unwrap();
    assert_eq!(contract.server().unwrap(), SERVER);
    assert_eq!(contract.initial_timestamp().unwrap(), 1_000);
    assert_eq!(contract.commitments().unwrap().len(), len);
    assert_eq!(contract.commitment_at(299).unwrap(), 299u16.to_be_bytes().to_vec());
    assert_eq!(contract.solution_at(1).unwrap().ciphertext, b"second".to_vec());
    assert_eq!(contract.solution_at(1).unwrap().timestamp, 1_160);
    assert_eq!(contract.settlement_at(0).unwrap(), Some(Settlement::Paid));
    assert_eq!(contract.settlement_at(1).unwrap(), Some(Settlement::PaidBack));
    assert_eq!(contract.settlement_at(2).unwrap(), None);
    assert_eq!(contract.balance_of(SOLVER).unwrap(), U256::from(2));
    assert_eq!(contract.balance_of(SERVER).unwrap(), U256::from(2));

    // Rules still hold after the restart.
    assert!(matches!(
        contract.initiate(SERVER, terms(1)),
        Err(EscrowError::AlreadyInitiated)
    ));
    assert!(matches!(
        contract.pay(SERVER, 0),
        Err(EscrowError::AlreadySettled(0))
    ));
}

#[test]
fn test_record_stored_as_rlp() {
    let dir = tempfile::tempdir().unwrap();
    let config = LedgerConfig::new(dir.path().to_path_buf());
    {
        let contract = LedgerContract::open(config.clone(), Arc::new(ManualClock::new(42))).unwrap();
        contract.initiate(SERVER, terms(2)).unwrap();
    }

    let storage = Storage::new(config).unwrap();
    let bytes = storage.get(Column::Terms, RECORD_KEY).unwrap().unwrap();
    let record = EscrowRecord::from_rlp_bytes(bytes.as_ref()).unwrap();
    assert_eq!(record.initial_timestamp, 42);
    assert_eq!(record.terms, terms(2));
}

#[test]
fn test_fresh_ledger_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let contract = LedgerContract::open(
        LedgerConfig::new(dir.path().to_path_buf()),
        Arc::new(ManualClock::new(0)),
    )
    .unwrap();
    assert!(matches!(contract.record(), Err(EscrowError::NotInitiated)));
}
