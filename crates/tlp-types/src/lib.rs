pub mod chain;
pub mod codec;
pub mod error;
pub mod escrow;
pub mod puzzle;

pub use chain::{AuxiliaryInfo, GmitlpPublic, GmitlpSecret, MitlpPublic, MitlpSecret};
pub use error::TypesError;
pub use escrow::{Coins, EscrowRecord, EscrowTerms, ServerInfo, Settlement, Solution, Timestamp};
pub use ethereum_types::{Address, U256};
pub use puzzle::{TlpPublic, TlpPuzzle, TlpSecret, decode_puzzles, encode_puzzles};

/// Plaintext or client-encrypted message bytes.
pub type Message = Vec<u8>;
/// Output of a commitment hash.
pub type Digest = Vec<u8>;
