//! Key-value storage for processed block data.
//!
//! `Storer` is where the block processor persists the transactions of a
//! committed block, keyed by transaction hash.
//!
//! Implementations:
//! - `MemStore` (this crate), an in-memory `BTreeMap`

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::HostError;

/// Abstraction over persistent block data storage.
pub trait Storer: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), HostError>;

    /// Returns `Ok(None)` if the key does not exist.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, HostError>;

    fn contains(&self, key: &[u8]) -> Result<bool, HostError> {
        Ok(self.get(key)?.is_some())
    }
}

/// In-memory store backed by a `BTreeMap`.
#[derive(Debug, Default)]
pub struct MemStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Storer for MemStore {
    fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), HostError> {
        self.data.write().insert(key.to_vec(), value);
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, HostError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn contains(&self, key: &[u8]) -> Result<bool, HostError> {
        Ok(self.data.read().contains_key(key))
    }
}
