use thiserror::Error;
use tlp_types::TypesError;

#[derive(Error, Debug)]
pub enum PuzzleError {
    #[error("Invalid key size {keysize}: {reason}")]
    InvalidKeySize { keysize: u32, reason: &'static str },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Modulus must be greater than one")]
    InvalidModulus,

    #[error("Symmetric key does not fit below the modulus")]
    KeyOutOfRange,

    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    #[error("Encryption failed")]
    Encryption,

    #[error("Decryption failed")]
    Decryption,

    #[error("Solved plaintext has {len} bytes, need at least {min}")]
    MalformedPlaintext { len: usize, min: usize },

    #[error("Commitment does not match the solved message")]
    CommitmentMismatch,

    #[error("Solve cancelled")]
    Cancelled,

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("Types error: {0}")]
    Types(#[from] TypesError),
}
