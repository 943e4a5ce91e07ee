//! Ledger Store
//!
//! Key-value persistence for the treasury ledger. The contract is
//! deliberately small: point get/set/delete plus ascending prefix
//! iteration. Atomicity across a whole logical operation is owned by the
//! hosting runtime, not by this layer.
//!
//! # Invariants
//!
//! - Iteration yields keys in ascending byte order.
//! - Iterators are lazy and restartable: each `iterate` call starts a
//!   fresh scan over the current contents.
//! - Key layout is defined exclusively in [`keys`]; business logic never
//!   constructs raw keys inline.
//!
//! Two implementations are provided: [`SledLedgerStore`] for durable
//! storage and [`MemoryLedgerStore`] for tests and embedding.

pub mod keys;

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

/// Error during store operations
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// Result type for store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Ordered key-value store contract used by the allocation ledger.
pub trait LedgerStore {
    /// Read the value under `key`, if present
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Write `value` under `key`, replacing any previous value
    fn set(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Remove `key` if present (absent keys are not an error)
    fn delete(&mut self, key: &[u8]) -> StorageResult<()>;

    /// Lazily scan all entries whose key starts with `prefix`, in
    /// ascending byte order
    fn iterate<'a>(
        &'a self,
        prefix: &[u8],
    ) -> Box<dyn Iterator<Item = StorageResult<(Vec<u8>, Vec<u8>)>> + 'a>;
}

// ============================================================================
// SLED BACKEND
// ============================================================================

/// Durable store backed by a single sled tree.
pub struct SledLedgerStore {
    // Db handle kept alive for the lifetime of the tree
    _db: sled::Db,
    tree: sled::Tree,
}

impl SledLedgerStore {
    const TREE_NAME: &'static [u8] = b"treasury_ledger";

    /// Open (or create) a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = sled::open(path)?;
        let tree = db.open_tree(Self::TREE_NAME)?;
        Ok(Self { _db: db, tree })
    }

    /// Open an ephemeral store that is discarded on drop.
    ///
    /// Used by tests; never write production data through this.
    pub fn open_temporary() -> StorageResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        let tree = db.open_tree(Self::TREE_NAME)?;
        Ok(Self { _db: db, tree })
    }

    /// Flush dirty buffers to disk
    pub fn flush(&self) -> StorageResult<()> {
        self.tree.flush()?;
        Ok(())
    }
}

impl LedgerStore for SledLedgerStore {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.tree.get(key)?.map(|ivec| ivec.to_vec()))
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.tree.insert(key, value)?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StorageResult<()> {
        self.tree.remove(key)?;
        Ok(())
    }

    fn iterate<'a>(
        &'a self,
        prefix: &[u8],
    ) -> Box<dyn Iterator<Item = StorageResult<(Vec<u8>, Vec<u8>)>> + 'a> {
        Box::new(self.tree.scan_prefix(prefix).map(|entry| {
            let (key, value) = entry?;
            Ok((key.to_vec(), value.to_vec()))
        }))
    }
}

// ============================================================================
// IN-MEMORY BACKEND
// ============================================================================

/// In-memory store over a `BTreeMap`, byte-ordered like the sled backend.
#[derive(Default)]
pub struct MemoryLedgerStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StorageResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn iterate<'a>(
        &'a self,
        prefix: &[u8],
    ) -> Box<dyn Iterator<Item = StorageResult<(Vec<u8>, Vec<u8>)>> + 'a> {
        let start = prefix.to_vec();
        Box::new(
            self.entries
                .range(start..)
                .take_while({
                    let prefix = prefix.to_vec();
                    move |(key, _)| key.starts_with(&prefix)
                })
                .map(|(key, value)| Ok((key.clone(), value.clone()))),
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise_basic_ops<S: LedgerStore>(store: &mut S) {
        assert_eq!(store.get(b"missing").unwrap(), None);

        store.set(b"alpha", b"1").unwrap();
        store.set(b"beta", b"2").unwrap();
        assert_eq!(store.get(b"alpha").unwrap(), Some(b"1".to_vec()));

        // overwrite
        store.set(b"alpha", b"3").unwrap();
        assert_eq!(store.get(b"alpha").unwrap(), Some(b"3".to_vec()));

        // delete is idempotent
        store.delete(b"alpha").unwrap();
        store.delete(b"alpha").unwrap();
        assert_eq!(store.get(b"alpha").unwrap(), None);
        assert_eq!(store.get(b"beta").unwrap(), Some(b"2".to_vec()));
    }

    fn exercise_prefix_scan<S: LedgerStore>(store: &mut S) {
        store.set(b"idx/a/1", b"").unwrap();
        store.set(b"idx/a/2", b"").unwrap();
        store.set(b"idx/b/1", b"").unwrap();
        store.set(b"other", b"").unwrap();

        let keys: Vec<Vec<u8>> = store
            .iterate(b"idx/a/")
            .map(|entry| entry.unwrap().0)
            .collect();
        assert_eq!(keys, vec![b"idx/a/1".to_vec(), b"idx/a/2".to_vec()]);

        // ascending byte order over the wider prefix
        let keys: Vec<Vec<u8>> = store
            .iterate(b"idx/")
            .map(|entry| entry.unwrap().0)
            .collect();
        assert_eq!(
            keys,
            vec![
                b"idx/a/1".to_vec(),
                b"idx/a/2".to_vec(),
                b"idx/b/1".to_vec()
            ]
        );

        // restartable: a second scan sees the same entries
        assert_eq!(store.iterate(b"idx/").count(), 3);
    }

    #[test]
    fn test_memory_store_basic_ops() {
        let mut store = MemoryLedgerStore::new();
        exercise_basic_ops(&mut store);
    }

    #[test]
    fn test_memory_store_prefix_scan() {
        let mut store = MemoryLedgerStore::new();
        exercise_prefix_scan(&mut store);
    }

    #[test]
    fn test_sled_store_basic_ops() {
        let mut store = SledLedgerStore::open_temporary().unwrap();
        exercise_basic_ops(&mut store);
    }

    #[test]
    fn test_sled_store_prefix_scan() {
        let mut store = SledLedgerStore::open_temporary().unwrap();
        exercise_prefix_scan(&mut store);
    }

    #[test]
    fn test_memory_store_len() {
        let mut store = MemoryLedgerStore::new();
        assert!(store.is_empty());
        store.set(b"k", b"v").unwrap();
        assert_eq!(store.len(), 1);
    }
}
