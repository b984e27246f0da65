use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("I/O error occurred: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(rocksdb::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Corrupt ledger entry: {0}")]
    Corrupt(String),

    #[error("Types error: {0}")]
    Types(#[from] tlp_types::TypesError),
}
