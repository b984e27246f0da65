/// RocksDB access for the escrow ledger.
///
/// Reads go through `DbReader`, writes through `DbWriter`; every call to
/// `DbWriter::write` lands as a single atomic `WriteBatch`.
use anyhow::Result;
use rocksdb::{DBPinnableSlice, DBWithThreadMode, MultiThreaded, Options, WriteBatch};
use std::sync::Arc;

use crate::Column;
use crate::LedgerConfig;
use crate::LedgerError;

/// Item returned by the database iterator.
/// Key and Value are boxed slices.
pub type IteratorItem = Result<(Box<[u8]>, Box<[u8]>)>;
/// Iterator type for database queries.
pub type DbIterator<'a> = Box<dyn Iterator<Item = IteratorItem> + Send + 'a>;

/// Trait abstracting database read operations.
pub trait DbReader: Send + Sync {
    /// `DBPinnableSlice` for RocksDB, `Vec<u8>` for in-memory stores.
    type Slice<'a>: AsRef<[u8]>
    where
        Self: 'a;

    fn get<'a>(&'a self, col: Column, key: &[u8]) -> Result<Option<Self::Slice<'a>>>;
    /// Iterates a column in ascending key order.
    fn iter<'a>(&'a self, col: Column) -> DbIterator<'a>;
}

/// A single put in a write batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOp {
    pub col: Column,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl WriteOp {
    pub fn put(col: Column, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        WriteOp {
            col,
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Trait abstracting atomic batched writes.
pub trait DbWriter: Send + Sync {
    fn write(&self, ops: &[WriteOp]) -> Result<()>;
}

fn missing_column(col: Column) -> LedgerError {
    LedgerError::Config(format!("Missing column family: {}", col.name()))
}

impl DbReader for DBWithThreadMode<MultiThreaded> {
    type Slice<'a> = DBPinnableSlice<'a>;

    fn get<'a>(&'a self, col: Column, key: &[u8]) -> Result<Option<Self::Slice<'a>>> {
        let handle = self.cf_handle(col.name()).ok_or_else(|| missing_column(col))?;
        self.get_pinned_cf(&handle, key)
            .map_err(|e| LedgerError::Database(e).into())
    }

    fn iter<'a>(&'a self, col: Column) -> DbIterator<'a> {
        match self.cf_handle(col.name()) {
            Some(handle) => {
                let iter = self
                    .iterator_cf(&handle, rocksdb::IteratorMode::Start)
                    .map(|res| res.map_err(|e| anyhow::Error::from(LedgerError::Database(e))));
                Box::new(iter)
            }
            None => {
                let item: IteratorItem = Err(missing_column(col).into());
                Box::new(std::iter::once(item))
            }
        }
    }
}

impl DbWriter for DBWithThreadMode<MultiThreaded> {
    fn write(&self, ops: &[WriteOp]) -> Result<()> {
        let mut batch = WriteBatch::default();
        for op in ops {
            let handle = self.cf_handle(op.col.name()).ok_or_else(|| missing_column(op.col))?;
            batch.put_cf(&handle, &op.key, &op.value);
        }
        DBWithThreadMode::write(self, batch).map_err(|e| LedgerError::Database(e).into())
    }
}

pub struct Storage {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl Storage {
    pub fn new(config: LedgerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.db_path).map_err(LedgerError::Io)?;

        let mut opts = Options::default();
        opts.create_if_missing(config.create_if_missing);
        opts.create_missing_column_families(config.create_missing_column_families);
        opts.set_compression_type(config.compression);
        opts.set_max_total_wal_size(config.max_total_wal_size);
        opts.set_write_buffer_size(config.db_write_buffer_size);
        opts.set_max_open_files(config.max_open_files);

        let descriptors = config
            .column_families
            .iter()
            .map(|col| col.descriptor(&opts))
            .collect::<Vec<_>>();

        let db = DBWithThreadMode::<MultiThreaded>::open_cf_descriptors(
            &opts,
            &config.db_path,
            descriptors,
        )
        .map_err(LedgerError::Database)?;
        log::debug!("opened escrow ledger at {}", config.db_path.display());

        Ok(Storage { db: Arc::new(db) })
    }
}

impl DbReader for Storage {
    type Slice<'a> = DBPinnableSlice<'a>;

    fn get<'a>(&'a self, col: Column, key: &[u8]) -> Result<Option<Self::Slice<'a>>> {
        DbReader::get(&*self.db, col, key)
    }

    fn iter<'a>(&'a self, col: Column) -> DbIterator<'a> {
        DbReader::iter(&*self.db, col)
    }
}

impl DbWriter for Storage {
    fn write(&self, ops: &[WriteOp]) -> Result<()> {
        DbWriter::write(&*self.db, ops)
    }
}
