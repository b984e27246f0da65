use std::path::PathBuf;

use anyhow::{Context, Result};
use tlp_escrow::{SmartContract, SystemClock};
use tlp_ledger::{LedgerConfig, LedgerContract};

/// Prints the escrow held in a ledger directory.
fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: tlp-ledger <ledger-dir>")?;
    let config = LedgerConfig::new(path);

    let contract = LedgerContract::open(config, std::sync::Arc::new(SystemClock))?;
    let record = match contract.record() {
        Ok(record) => record,
        Err(e) => {
            println!("No escrow: {}", e);
            return Ok(());
        }
    };

    println!("Server: {:?}", record.server);
    println!("Helper: {:?}", record.terms.helper);
    println!("Initiated at: {} ms", record.initial_timestamp);
    println!("Start offset: {} ms", record.terms.start_time);
    for index in 0..record.terms.len() {
        let solved = contract.solution_at(index).ok();
        println!(
            "  #{} coins={} bound={} ms solved_at={:?} settlement={:?}",
            index,
            record.terms.coins[index],
            record.terms.upper_bounds[index],
            solved.map(|s| s.timestamp),
            contract.settlement_at(index)?,
        );
    }
    for (account, balance) in contract.snapshot().balances() {
        println!("Balance {:?}: {}", account, balance);
    }

    Ok(())
}
