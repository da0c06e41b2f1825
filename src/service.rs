//! The query handlers. Each operation opens exactly one transaction against the engine and
//! re-reads the store on every call; nothing is cached between calls.
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::engine::KvsEngine;
use crate::{KvsError, Record, Result};

/// the number of records returned by [`KeyService::list`] when no limit is given
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Statistics about the store, computed on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// the number of keys currently stored
    pub num_keys: u64,
    /// the size of the engine's directory on disk, in bytes
    pub database_size: u64,
}

/// Performs the list, get, create, update, delete, search and stats operations against a
/// [`KvsEngine`].
#[derive(Clone)]
pub struct KeyService<E: KvsEngine> {
    engine: E,
}

impl<E: KvsEngine> KeyService<E> {
    /// creates a service that reads and writes the given `engine`
    pub fn new(engine: E) -> Self {
        KeyService { engine }
    }

    /// the engine this service operates on
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// returns up to `limit` records, always starting from the first key of the store
    #[instrument(skip(self))]
    pub fn list(&self, limit: usize) -> Result<Vec<Record>> {
        self.engine.view(|txn| {
            txn.iter()
                .take(limit)
                .map(|entry| entry.map(Record::from))
                .collect()
        })
    }

    /// returns the record stored under `key`
    ///
    /// # Errors
    /// returns [`KvsError::KeyNotFound`] if `key` is not in the store
    #[instrument(skip(self))]
    pub fn get(&self, key: &str) -> Result<Record> {
        self.engine
            .view(|txn| txn.get(key.as_bytes()))?
            .map(Record::from)
            .ok_or(KvsError::KeyNotFound)
    }

    /// stores `value` under `key`, overwriting any existing value
    ///
    /// # Errors
    /// returns [`KvsError::Validation`] if `key` is empty. The store is not touched in that case.
    #[instrument(skip(self, value))]
    pub fn create(&self, key: &str, value: &str) -> Result<Record> {
        if key.is_empty() {
            return Err(KvsError::Validation("Key cannot be empty".to_owned()));
        }
        self.set(key, value)
    }

    /// replaces the value stored under `key`. A missing `key` is created.
    #[instrument(skip(self, value))]
    pub fn update(&self, key: &str, value: &str) -> Result<Record> {
        self.set(key, value)
    }

    /// removes `key` from the store
    ///
    /// # Errors
    /// returns [`KvsError::KeyNotFound`] if `key` is not in the store
    #[instrument(skip(self))]
    pub fn delete(&self, key: &str) -> Result<()> {
        self.engine.update(|txn| txn.delete(key.as_bytes()))
    }

    /// returns every record whose key contains `query`, ignoring case, in key order
    ///
    /// # Errors
    /// returns [`KvsError::Validation`] if `query` is empty
    #[instrument(skip(self))]
    pub fn search(&self, query: &str) -> Result<Vec<Record>> {
        if query.is_empty() {
            return Err(KvsError::Validation(
                "Query parameter 'q' is required".to_owned(),
            ));
        }
        let needle = query.to_lowercase();

        let found: Vec<Record> = self.engine.view(|txn| {
            let mut found = Vec::new();
            for entry in txn.iter() {
                let entry = entry?;
                if String::from_utf8_lossy(&entry.key)
                    .to_lowercase()
                    .contains(&needle)
                {
                    found.push(Record::from(entry));
                }
            }
            Ok(found)
        })?;
        debug!(matches = found.len());
        Ok(found)
    }

    /// counts the keys in the store and measures the size of its directory.
    /// The two values are not taken atomically.
    #[instrument(skip(self))]
    pub fn stats(&self) -> Result<Stats> {
        let num_keys = self
            .engine
            .view(|txn| txn.keys().try_fold(0_u64, |count, key| key.map(|_| count + 1)))?;

        Ok(Stats {
            num_keys,
            database_size: self.engine.size_on_disk(),
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<Record> {
        let version = self
            .engine
            .update(|txn| txn.set(key.as_bytes(), value.as_bytes()))?;
        Ok(Record::new(key, value, version))
    }
}

/// parses the raw `limit` query parameter of a list request.
///
/// A missing or unparseable value falls back to [`DEFAULT_LIST_LIMIT`], negative values are
/// clamped to 0.
pub fn parse_limit(raw: Option<&str>) -> usize {
    match raw.map(|s| s.parse::<i64>()) {
        Some(Ok(limit)) => usize::try_from(limit.max(0)).unwrap_or(usize::MAX),
        _ => DEFAULT_LIST_LIMIT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_to_fifty() {
        assert_eq!(parse_limit(None), DEFAULT_LIST_LIMIT);
        assert_eq!(parse_limit(Some("")), DEFAULT_LIST_LIMIT);
        assert_eq!(parse_limit(Some("ten")), DEFAULT_LIST_LIMIT);
    }

    #[test]
    fn negative_limit_is_clamped() {
        assert_eq!(parse_limit(Some("-5")), 0);
        assert_eq!(parse_limit(Some("0")), 0);
        assert_eq!(parse_limit(Some("7")), 7);
    }
}
