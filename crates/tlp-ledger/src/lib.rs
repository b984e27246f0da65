mod config;
mod contract;
mod db;
mod error;
mod repository;

pub use config::Column;
pub use config::LedgerConfig;
pub use contract::LedgerContract;
pub use db::{DbIterator, DbReader, DbWriter, IteratorItem, Storage, WriteOp};
pub use error::LedgerError;
pub use repository::{EscrowRepository, RECORD_KEY};
