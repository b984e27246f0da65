pub mod clock;
pub mod contract;
pub mod error;
pub mod memory;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use contract::{COMMITMENT_BATCH_SIZE, SmartContract, commitment_batches};
pub use error::EscrowError;
pub use memory::InMemoryContract;
pub use state::{Credit, EscrowState};
