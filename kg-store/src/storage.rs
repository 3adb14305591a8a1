//! RocksDB storage with pessimistic transactions
//!
//! Persistent storage for graph records using a RocksDB `TransactionDB` with
//! LZ4 compression. Writers run inside one transaction per operation (or per
//! bulk batch); readers run against a snapshot so they never observe a
//! partially committed write.

use std::path::{Path, PathBuf};

use rocksdb::{
    DBCompressionType, Direction, IteratorMode, Options, SnapshotWithThreadMode, Transaction,
    TransactionDB, TransactionDBOptions,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::traversal::TraversalLimits;

/// Raw key/value pair as returned by RocksDB iterators
pub(crate) type KvPair = (Box<[u8]>, Box<[u8]>);

/// Store tuning knobs, fixed for the lifetime of the store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How long a writer waits for a row lock before aborting (ms)
    pub lock_timeout_ms: i64,
    /// Bounds applied to every traversal
    pub limits: TraversalLimits,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 2000,
            limits: TraversalLimits::default(),
        }
    }
}

/// Read access shared by snapshots and open transactions
pub(crate) trait KvRead {
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// All pairs whose key starts with `prefix`, in key order
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>>;

    fn get_record<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        self.get_raw(key)?.map(|bytes| decode(&bytes)).transpose()
    }

    fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get_raw(key)?.is_some())
    }

    fn count_prefix(&self, prefix: &[u8]) -> Result<usize> {
        Ok(self.scan_prefix(prefix)?.len())
    }
}

fn collect_prefix<I>(iter: I, prefix: &[u8]) -> Result<Vec<KvPair>>
where
    I: Iterator<Item = std::result::Result<KvPair, rocksdb::Error>>,
{
    let mut pairs = Vec::new();
    for item in iter {
        let (key, value) = item?;
        if !key.starts_with(prefix) {
            break;
        }
        pairs.push((key, value));
    }
    Ok(pairs)
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Consistent point-in-time view of the store
pub(crate) struct ReadTx<'db> {
    snapshot: SnapshotWithThreadMode<'db, TransactionDB>,
}

impl KvRead for ReadTx<'_> {
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.snapshot.get(key)?)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>> {
        let iter = self
            .snapshot
            .iterator(IteratorMode::From(prefix, Direction::Forward));
        collect_prefix(iter, prefix)
    }
}

/// An open write transaction.
///
/// Reads through a `WriteTx` see its own uncommitted writes. Dropping it
/// without [`GraphStore::write`] committing rolls everything back.
pub struct WriteTx<'db> {
    txn: Transaction<'db, TransactionDB>,
}

impl WriteTx<'_> {
    /// Read a key and take an exclusive lock on it until commit
    pub(crate) fn get_for_update(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.txn.get_for_update(key, true)?)
    }

    pub(crate) fn get_record_for_update<T: DeserializeOwned>(
        &self,
        key: &[u8],
    ) -> Result<Option<T>> {
        self.get_for_update(key)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub(crate) fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<()> {
        Ok(self.txn.put(key, value)?)
    }

    pub(crate) fn put_record<T: Serialize>(&self, key: &[u8], value: &T) -> Result<()> {
        self.put_raw(key, &encode(value)?)
    }

    pub(crate) fn delete(&self, key: &[u8]) -> Result<()> {
        Ok(self.txn.delete(key)?)
    }

    /// Delete every key under `prefix`, returning how many were removed
    pub(crate) fn delete_prefix(&self, prefix: &[u8]) -> Result<usize> {
        let pairs = self.scan_prefix(prefix)?;
        for (key, _) in &pairs {
            self.delete(key)?;
        }
        Ok(pairs.len())
    }
}

impl KvRead for WriteTx<'_> {
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.txn.get(key)?)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>> {
        let iter = self
            .txn
            .iterator(IteratorMode::From(prefix, Direction::Forward));
        collect_prefix(iter, prefix)
    }
}

/// Transactional graph store backed by RocksDB
pub struct GraphStore {
    db: TransactionDB,
    path: PathBuf,
    config: StoreConfig,
}

impl GraphStore {
    /// Open (or create) a store at the given directory
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_max_background_jobs(2);
        opts.set_bytes_per_sync(1048576); // 1MB
        opts.set_compression_type(DBCompressionType::Lz4);

        let mut txn_opts = TransactionDBOptions::default();
        txn_opts.set_txn_lock_timeout(config.lock_timeout_ms);

        let db = TransactionDB::open(&opts, &txn_opts, path)?;

        log::info!("GraphStore opened at: {}", path.display());

        let store = Self {
            db,
            path: path.to_path_buf(),
            config,
        };

        crate::migration::migrate_if_needed(&store)?;
        Ok(store)
    }

    /// Open with default configuration
    pub fn open_default(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path, StoreConfig::default())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Snapshot reader
    pub(crate) fn read(&self) -> ReadTx<'_> {
        ReadTx {
            snapshot: self.db.snapshot(),
        }
    }

    /// Run `f` inside one transaction.
    ///
    /// Commits when `f` returns `Ok`; rolls back when it returns `Err`, in
    /// which case none of its writes become visible. Writers are serialized
    /// on the full-text statistics lock, so a second writer waits up to the
    /// configured lock timeout.
    pub fn write<T>(&self, f: impl FnOnce(&WriteTx<'_>) -> Result<T>) -> Result<T> {
        let tx = WriteTx {
            txn: self.db.transaction(),
        };
        match crate::index::lock_writers(&tx).and_then(|_| f(&tx)) {
            Ok(value) => {
                tx.txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.txn.rollback() {
                    log::warn!("Rollback failed after error '{}': {}", e, rollback_err);
                }
                Err(e)
            }
        }
    }
}
