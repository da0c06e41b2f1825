//! This module provides the adapter between the query handlers and the embedded storage engine.
//!
//! The handlers only ever see the [`KvsEngine`] trait along with the [`ReadTxn`] and
//! [`WriteTxn`] views it hands out, so a test (or a different engine) can be swapped in without
//! touching them. The one implementation shipped is [`SledKvsEngine`], a thin wrapper around the
//! [`sled`] database.
//!
//! [`sled`]: https://docs.rs/sled/latest/sled/
use crate::Result;

/// a single key/value pair as stored in the engine, along with the version token that was
/// assigned to it by its last write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// the raw key bytes
    pub key: Vec<u8>,
    /// the raw value bytes
    pub value: Vec<u8>,
    /// the version token of the last committed write of this key
    pub version: u64,
}

/// A read only view of the store.
pub trait ReadTxn {
    /// Gets the entry associated with the given `key`
    ///
    /// Returns `None` if the given `key` does not exist.
    fn get(&self, key: &[u8]) -> Result<Option<Entry>>;

    /// returns a lazy iterator over every entry of the store, in ascending key order
    fn iter(&self) -> Box<dyn Iterator<Item = Result<Entry>> + '_>;

    /// returns a lazy iterator over every key of the store, in ascending key order.
    /// Values are never decoded.
    fn keys(&self) -> Box<dyn Iterator<Item = Result<Vec<u8>>> + '_>;
}

/// A view of the store that is only valid inside of a write transaction.
pub trait WriteTxn {
    /// sets a `key` and `value`, returning the version token assigned to the write.
    ///
    /// If the given `key` already exists the previous `value` will be overwritten.
    fn set(&self, key: &[u8], value: &[u8]) -> Result<u64>;

    /// Removes the given `key` (and associated value) from the store
    ///
    /// # Errors
    ///
    /// Returns `KvsError::KeyNotFound` if the given `key` is not found.
    fn delete(&self, key: &[u8]) -> Result<()>;
}

/// A trait for the transactional functionality of a key/value storage engine
pub trait KvsEngine: Clone + Send + Sync + 'static {
    /// runs `f` against a read only view of the store.
    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T>;

    /// runs `f` inside of a write transaction.
    ///
    /// All mutations made by `f` are committed atomically if it returns `Ok`, and discarded if
    /// it returns `Err`. `f` may be invoked more than once if the engine detects a conflict
    /// with another writer.
    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: Fn(&dyn WriteTxn) -> Result<T>;

    /// returns the total size, in bytes, of the files the engine keeps on disk
    fn size_on_disk(&self) -> u64;

    /// flushes any buffered writes to disk
    fn flush(&self) -> Result<()>;
}

mod sled_engine;

pub use self::sled_engine::SledKvsEngine;
