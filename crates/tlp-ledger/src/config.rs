use anyhow::Result;
use std::path::PathBuf;

use crate::LedgerError;

/// Configuration for the escrow ledger database.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub db_path: PathBuf,

    pub create_if_missing: bool,
    pub create_missing_column_families: bool,
    pub compression: rocksdb::DBCompressionType,
    pub max_total_wal_size: u64,
    pub db_write_buffer_size: usize,
    pub max_open_files: i32,

    pub column_families: Vec<Column>,
}

impl LedgerConfig {
    /// Creates a ledger configuration rooted at `base_path`.
    pub fn new(base_path: PathBuf) -> Self {
        LedgerConfig {
            db_path: base_path.join("escrow"),
            create_if_missing: true,
            create_missing_column_families: true,
            compression: rocksdb::DBCompressionType::Lz4,
            max_total_wal_size: 64 * 1024 * 1024, // 64MB
            db_write_buffer_size: 16 * 1024 * 1024, // 16MB
            max_open_files: 64,
            column_families: Column::all().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Default,
    Terms,
    Commitments,
    Solutions,
    Settlements,
    Balances,
}

impl Column {
    /// Returns the column family name.
    pub fn name(&self) -> &'static str {
        match self {
            Column::Default => "default",
            Column::Terms => "terms",
            Column::Commitments => "commitments",
            Column::Solutions => "solutions",
            Column::Settlements => "settlements",
            Column::Balances => "balances",
        }
    }

    /// Returns all columns in order.
    pub fn all() -> &'static [Column] {
        &[
            Column::Default,
            Column::Terms,
            Column::Commitments,
            Column::Solutions,
            Column::Settlements,
            Column::Balances,
        ]
    }

    /// Parses a column from its name string.
    pub fn from_name(name: &str) -> Result<Column> {
        Column::all()
            .iter()
            .copied()
            .find(|column| column.name() == name)
            .ok_or_else(|| LedgerError::Config(format!("Unknown column name: {}", name)).into())
    }

    /// Columns keyed by a big-endian u64 puzzle index.
    pub fn is_indexed(&self) -> bool {
        matches!(
            self,
            Column::Commitments | Column::Solutions | Column::Settlements
        )
    }

    pub fn descriptor(&self, opts: &rocksdb::Options) -> rocksdb::ColumnFamilyDescriptor {
        rocksdb::ColumnFamilyDescriptor::new(self.name(), opts.clone())
    }
}
