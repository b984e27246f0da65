use ethereum_types::Address;
use thiserror::Error;
use tlp_types::{Timestamp, TypesError};

#[derive(Error, Debug)]
pub enum EscrowError {
    #[error("Escrow has not been initiated")]
    NotInitiated,

    #[error("Escrow is already initiated")]
    AlreadyInitiated,

    #[error("{caller:?} is not allowed to {action}")]
    Unauthorized {
        caller: Address,
        action: &'static str,
    },

    #[error("Commitments were already published")]
    CommitmentsAlreadySet,

    #[error("Expected {expected} commitments, got {actual}")]
    CommitmentCountMismatch { expected: usize, actual: usize },

    #[error("Index {index} out of range for {len} puzzles")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Every published commitment already has a solution")]
    TooManySolutions,

    #[error("Solutions open at {start} ms, now is {now} ms")]
    NotStarted { now: Timestamp, start: Timestamp },

    #[error("No solution registered at index {0}")]
    NoSolution(usize),

    #[error("Index {0} is already settled")]
    AlreadySettled(usize),

    #[error("Types error: {0}")]
    Types(#[from] TypesError),

    #[error("Escrow backend error: {0}")]
    Backend(String),
}
