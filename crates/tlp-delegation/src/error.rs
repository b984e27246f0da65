use rug::Integer;
use thiserror::Error;
use tlp_escrow::EscrowError;
use tlp_puzzle::PuzzleError;
use tlp_types::{Coins, Timestamp};

#[derive(Error, Debug)]
pub enum DelegationError {
    #[error("Escrow deposit {offered} at index {index} is below the acceptable {required}")]
    InsufficientCoins {
        index: usize,
        offered: Coins,
        required: Coins,
    },

    #[error("Puzzle {index} needs {squarings} squarings at {rate}/s, more than its {slot_ms} ms slot")]
    DeadlineInfeasible {
        index: usize,
        squarings: Integer,
        rate: u64,
        slot_ms: Timestamp,
    },

    #[error("Claimed rate {claimed} squarings/s exceeds the assumed maximum {bound}")]
    ClaimedRateExceedsBound { claimed: u64, bound: u64 },

    #[error("No squaring rate bound known for {0}-bit moduli")]
    UnknownKeysize(u32),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Solution {index} arrived {elapsed} ms after initiation, deadline was {bound} ms")]
    DeadlineMissed {
        index: usize,
        elapsed: Timestamp,
        bound: Timestamp,
    },

    #[error("Solution {0} does not open its commitment")]
    CommitmentMismatch(usize),

    #[error("No solution registered at index {0}")]
    MissingSolution(usize),

    #[error("Puzzle error: {0}")]
    Puzzle(#[from] PuzzleError),

    #[error("Escrow error: {0}")]
    Escrow(#[from] EscrowError),
}

impl DelegationError {
    /// Failures that make the server reclaim a deposit instead of paying.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            DelegationError::DeadlineMissed { .. }
                | DelegationError::CommitmentMismatch(_)
                | DelegationError::MissingSolution(_)
        )
    }
}
