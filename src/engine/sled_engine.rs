use std::path::{Path, PathBuf};

use chrono::Utc;
use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionalTree};
use sled::{Db, Tree};
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use super::{Entry, KvsEngine, ReadTxn, WriteTxn};
use crate::{KvsError, Result};

// first byte of every value written by this crate
const ENVELOPE_TAG: u8 = 0xB7;
// number of bytes holding the version token, after the tag
const VERSION_LEN: usize = 8;
const HEADER_LEN: usize = 1 + VERSION_LEN;

/// A [`KvsEngine`] backed by the [`sled`] embedded database.
///
/// Every value is stored behind a one byte tag and an 8 byte, big-endian version token. The
/// token is the Unix time (in seconds) of the transaction that wrote it, so the timestamp
/// reported right after a write is the same one later read back from the store. Values without
/// the tag were not written by this crate; they are read back whole with a version of 0.
///
/// Cloning a `SledKvsEngine` is cheap, all clones share the same underlying database handle.
///
/// [`sled`]: https://docs.rs/sled/latest/sled/
#[derive(Clone)]
pub struct SledKvsEngine {
    db: Db,
    // directory holding the sled files
    path: PathBuf,
}

impl SledKvsEngine {
    /// opens (or creates) a sled database rooted at the given `path`
    ///
    /// # Errors
    /// returns [`KvsError::Sled`] if the database could not be opened
    #[instrument]
    pub fn open(path: &Path) -> Result<SledKvsEngine> {
        info!("opening sled engine at {:?}", path);
        let db = sled::Config::new().path(path).open()?;
        debug!(recovered = db.was_recovered());

        Ok(SledKvsEngine {
            db,
            path: path.to_path_buf(),
        })
    }
}

impl KvsEngine for SledKvsEngine {
    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T>,
    {
        f(&SledReadTxn { tree: &self.db })
    }

    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: Fn(&dyn WriteTxn) -> Result<T>,
    {
        let result = self.db.transaction(|tree| {
            let txn = SledWriteTxn {
                tree,
                version: now_version(),
            };
            // conflicts are handed back to sled so that it re-runs the closure
            f(&txn).map_err(|e| match e {
                KvsError::Transaction(conflict) => ConflictableTransactionError::from(conflict),
                KvsError::Sled(e) => ConflictableTransactionError::Storage(e),
                e => ConflictableTransactionError::Abort(e),
            })
        });

        match result {
            Ok(value) => Ok(value),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(KvsError::Sled(e)),
        }
    }

    fn size_on_disk(&self) -> u64 {
        WalkDir::new(&self.path)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.metadata().ok())
            .map(|meta| meta.len())
            .sum()
    }

    fn flush(&self) -> Result<()> {
        let flushed = self.db.flush()?;
        debug!(flushed, "flushed sled engine");
        Ok(())
    }
}

struct SledReadTxn<'a> {
    tree: &'a Tree,
}

impl ReadTxn for SledReadTxn<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Entry>> {
        Ok(self.tree.get(key)?.map(|raw| decode(key, &raw)))
    }

    fn iter(&self) -> Box<dyn Iterator<Item = Result<Entry>> + '_> {
        Box::new(self.tree.iter().map(|item| {
            let (key, raw) = item?;
            Ok(decode(&key, &raw))
        }))
    }

    fn keys(&self) -> Box<dyn Iterator<Item = Result<Vec<u8>>> + '_> {
        Box::new(self.tree.iter().keys().map(|key| Ok(key?.to_vec())))
    }
}

struct SledWriteTxn<'a> {
    tree: &'a TransactionalTree,
    // version token stamped onto every write made by this transaction
    version: u64,
}

impl WriteTxn for SledWriteTxn<'_> {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<u64> {
        self.tree.insert(key, encode(self.version, value))?;
        Ok(self.version)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        match self.tree.remove(key)? {
            Some(_) => Ok(()),
            None => Err(KvsError::KeyNotFound),
        }
    }
}

/// the version token for a write happening right now
fn now_version() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

fn encode(version: u64, value: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + value.len());
    buf.push(ENVELOPE_TAG);
    buf.extend_from_slice(&version.to_be_bytes());
    buf.extend_from_slice(value);
    buf
}

/// splits a stored value into its version token and value bytes.
/// Untagged or truncated values are returned whole with a version of 0.
fn decode(key: &[u8], raw: &[u8]) -> Entry {
    let (version, value) = match raw.split_first() {
        Some((&ENVELOPE_TAG, rest)) if rest.len() >= VERSION_LEN => {
            let (head, tail) = rest.split_at(VERSION_LEN);
            let mut token = [0_u8; VERSION_LEN];
            token.copy_from_slice(head);
            (u64::from_be_bytes(token), tail)
        }
        _ => (0, raw),
    };

    Entry {
        key: key.to_vec(),
        value: value.to_vec(),
        version,
    }
}
