//! In-memory pools for testing and in-process wiring.
//!
//! Every pool guards its maps with a `parking_lot::RwLock`: lookups run
//! concurrently, insertions are exclusive.

use std::collections::{BTreeMap, HashMap, HashSet};

use causeway_primitives::types::short_hex;
use causeway_primitives::{Hash, HeaderVariant, TxVariant};
use parking_lot::RwLock;
use tracing::trace;

use crate::error::HostError;
use crate::traits::{HeaderHandler, HeadersPool, OutgoingOperationsPool, TransactionPool, WhitelistHandler};
use crate::types::OutgoingOperationsBatch;

/// Headers pool keyed by hash.
#[derive(Default)]
pub struct MemHeadersPool {
    headers: RwLock<HashMap<Hash, HeaderVariant>>,
    handlers: RwLock<Vec<HeaderHandler>>,
}

impl MemHeadersPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hashes of every stored header with the given nonce.
    pub fn hashes_by_nonce(&self, nonce: u64) -> Vec<Hash> {
        let mut hashes: Vec<Hash> = self
            .headers
            .read()
            .iter()
            .filter(|(_, h)| h.nonce() == nonce)
            .map(|(hash, _)| *hash)
            .collect();
        hashes.sort_unstable();
        hashes
    }
}

impl HeadersPool for MemHeadersPool {
    fn add_header(&self, hash: Hash, header: HeaderVariant) -> bool {
        {
            let mut headers = self.headers.write();
            if headers.contains_key(&hash) {
                return false;
            }
            headers.insert(hash, header.clone());
        }
        trace!(target: "pool::headers", hash = %short_hex(&hash), nonce = header.nonce(), "header added");

        // handlers run outside the map lock so they may read the pool
        let handlers = self.handlers.read().clone();
        for handler in handlers {
            handler(&hash, &header);
        }
        true
    }

    fn get_header(&self, hash: &Hash) -> Option<HeaderVariant> {
        self.headers.read().get(hash).cloned()
    }

    fn register_handler(&self, handler: HeaderHandler) {
        self.handlers.write().push(handler);
    }

    fn len(&self) -> usize {
        self.headers.read().len()
    }
}

/// Transaction pool sharded by cache id, with an optional capacity.
pub struct MemTxPool {
    caches: RwLock<HashMap<String, HashMap<Hash, (TxVariant, usize)>>>,
    capacity: usize,
}

impl MemTxPool {
    /// Unbounded pool.
    pub fn new() -> Self {
        Self::with_capacity(usize::MAX)
    }

    /// Pool refusing insertions beyond `capacity` transactions in total.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            caches: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Total number of transactions over all caches.
    pub fn len(&self) -> usize {
        self.caches.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of transactions in one cache.
    pub fn cache_len(&self, cache_id: &str) -> usize {
        self.caches.read().get(cache_id).map_or(0, HashMap::len)
    }

    /// Remove a transaction from every cache.
    pub fn remove(&self, hash: &Hash) {
        for cache in self.caches.write().values_mut() {
            cache.remove(hash);
        }
    }
}

impl Default for MemTxPool {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionPool for MemTxPool {
    fn add_data(
        &self,
        hash: Hash,
        tx: TxVariant,
        size: usize,
        cache_id: &str,
    ) -> Result<(), HostError> {
        let mut caches = self.caches.write();
        let total: usize = caches.values().map(HashMap::len).sum();
        let cache = caches.entry(cache_id.to_string()).or_default();
        if cache.contains_key(&hash) {
            return Ok(());
        }
        if total >= self.capacity {
            return Err(HostError::pool(format!(
                "transaction pool is full ({} entries)",
                self.capacity
            )));
        }
        cache.insert(hash, (tx, size));
        Ok(())
    }

    fn search_first(&self, hash: &Hash) -> Option<TxVariant> {
        self.caches
            .read()
            .values()
            .find_map(|cache| cache.get(hash).map(|(tx, _)| tx.clone()))
    }
}

/// Outgoing operations keyed by hash of hashes.
#[derive(Default)]
pub struct MemOutgoingOperations {
    batches: RwLock<BTreeMap<Vec<u8>, OutgoingOperationsBatch>>,
}

impl MemOutgoingOperations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.batches.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OutgoingOperationsPool for MemOutgoingOperations {
    fn add(&self, batch: OutgoingOperationsBatch) {
        self.batches
            .write()
            .insert(batch.hash_of_hashes.clone(), batch);
    }

    fn get(&self, hash_of_hashes: &[u8]) -> Option<OutgoingOperationsBatch> {
        self.batches.read().get(hash_of_hashes).cloned()
    }

    fn confirm_operation(&self, hash_of_hashes: &[u8], hash: &[u8]) -> Result<(), HostError> {
        let mut batches = self.batches.write();
        let batch = batches.get_mut(hash_of_hashes).ok_or_else(|| {
            HostError::not_found(format!(
                "outgoing operations with hash of hashes {}",
                short_hex(hash_of_hashes)
            ))
        })?;
        let operation = batch
            .operations
            .iter_mut()
            .find(|op| op.hash == hash)
            .ok_or_else(|| {
                HostError::not_found(format!("outgoing operation {}", short_hex(hash)))
            })?;
        operation.confirmed = true;
        Ok(())
    }
}

/// Set of whitelisted transaction hashes.
#[derive(Default)]
pub struct MemWhitelist {
    hashes: RwLock<HashSet<Hash>>,
}

impl MemWhitelist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.hashes.read().contains(hash)
    }

    pub fn len(&self) -> usize {
        self.hashes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WhitelistHandler for MemWhitelist {
    fn add(&self, hashes: &[Hash]) {
        self.hashes.write().extend(hashes.iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::types::OutgoingOperation;
    use causeway_primitives::{Header, ResultTransaction};

    fn header(nonce: u64) -> HeaderVariant {
        HeaderVariant::Plain(Header {
            nonce,
            ..Default::default()
        })
    }

    #[test]
    fn test_headers_pool_is_idempotent_by_hash() {
        let pool = MemHeadersPool::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        pool.register_handler(Arc::new(move |_: &Hash, _: &HeaderVariant| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(pool.add_header([1; 32], header(1)));
        assert!(!pool.add_header([1; 32], header(1)));
        assert_eq!(pool.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(pool.get_header(&[1; 32]), Some(header(1)));
    }

    #[test]
    fn test_hashes_by_nonce() {
        let pool = MemHeadersPool::new();
        pool.add_header([2; 32], header(5));
        pool.add_header([1; 32], header(5));
        pool.add_header([3; 32], header(6));
        assert_eq!(pool.hashes_by_nonce(5), vec![[1; 32], [2; 32]]);
    }

    #[test]
    fn test_tx_pool_caches_and_capacity() {
        let pool = MemTxPool::with_capacity(1);
        let tx = TxVariant::Result(ResultTransaction::default());
        pool.add_data([1; 32], tx.clone(), 10, "a_b").unwrap();
        // same hash again is a no-op, not a capacity error
        pool.add_data([1; 32], tx.clone(), 10, "a_b").unwrap();
        assert!(pool.add_data([2; 32], tx.clone(), 10, "a_b").is_err());

        assert_eq!(pool.cache_len("a_b"), 1);
        assert_eq!(pool.search_first(&[1; 32]), Some(tx));
        assert!(pool.search_first(&[2; 32]).is_none());

        pool.remove(&[1; 32]);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_outgoing_operations_confirm() {
        let pool = MemOutgoingOperations::new();
        pool.add(OutgoingOperationsBatch {
            hash_of_hashes: vec![9],
            operations: vec![OutgoingOperation {
                hash: vec![1],
                data: b"op".to_vec(),
                confirmed: false,
            }],
        });

        assert!(pool.confirm_operation(&[8], &[1]).is_err());
        assert!(pool.confirm_operation(&[9], &[2]).is_err());
        pool.confirm_operation(&[9], &[1]).unwrap();
        assert!(pool.get(&[9]).unwrap().is_fully_confirmed());
    }

    #[test]
    fn test_whitelist() {
        let wl = MemWhitelist::new();
        wl.add(&[[1; 32], [2; 32], [1; 32]]);
        assert_eq!(wl.len(), 2);
        assert!(wl.contains(&[2; 32]));
    }
}
