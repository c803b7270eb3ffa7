//! Per-transaction gas bookkeeping for block building.
//!
//! `GasComputation` records the gas provided, refunded and penalized for
//! every transaction of the block being built. A `reset(key)` opens a
//! restore point: every hash touched afterwards is remembered under `key`
//! and `restore_gas_since_last_reset(key)` drops their entries again, so a
//! failed transaction leaves no gas behind.

use std::collections::HashMap;

use causeway_primitives::{Hash, ShardId, TxVariant};
use parking_lot::Mutex;

use crate::error::HostError;
use crate::traits::GasHandler;

#[derive(Debug, Default)]
struct GasBook {
    provided: HashMap<Hash, u64>,
    refunded: HashMap<Hash, u64>,
    penalized: HashMap<Hash, u64>,
    touched_since_reset: HashMap<Hash, Vec<Hash>>,
}

impl GasBook {
    fn touch(&mut self, tx_hash: Hash) {
        for touched in self.touched_since_reset.values_mut() {
            touched.push(tx_hash);
        }
    }

    fn forget(&mut self, tx_hash: &Hash) {
        self.provided.remove(tx_hash);
        self.refunded.remove(tx_hash);
        self.penalized.remove(tx_hash);
    }
}

/// In-memory `GasHandler`.
#[derive(Debug, Default)]
pub struct GasComputation {
    book: Mutex<GasBook>,
}

impl GasComputation {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sum(map: &HashMap<Hash, u64>) -> u64 {
    map.values().fold(0u64, |acc, v| acc.saturating_add(*v))
}

impl GasHandler for GasComputation {
    fn compute_gas_provided_by_tx(
        &self,
        _sender_shard: ShardId,
        _receiver_shard: ShardId,
        tx: &TxVariant,
    ) -> Result<(u64, u64), HostError> {
        match tx {
            TxVariant::Plain(tx) => Ok((tx.gas_limit, tx.gas_limit)),
            TxVariant::Result(scr) => Ok((scr.gas_limit, scr.gas_limit)),
            TxVariant::Reward(_) | TxVariant::Receipt(_) => Ok((0, 0)),
        }
    }

    fn set_gas_provided(&self, gas: u64, tx_hash: Hash) {
        let mut book = self.book.lock();
        book.provided.insert(tx_hash, gas);
        book.touch(tx_hash);
    }

    fn set_gas_refunded(&self, gas: u64, tx_hash: Hash) {
        let mut book = self.book.lock();
        book.refunded.insert(tx_hash, gas);
        book.touch(tx_hash);
    }

    fn set_gas_penalized(&self, gas: u64, tx_hash: Hash) {
        let mut book = self.book.lock();
        book.penalized.insert(tx_hash, gas);
        book.touch(tx_hash);
    }

    fn gas_provided(&self, tx_hash: &Hash) -> u64 {
        self.book.lock().provided.get(tx_hash).copied().unwrap_or(0)
    }

    fn gas_refunded(&self, tx_hash: &Hash) -> u64 {
        self.book.lock().refunded.get(tx_hash).copied().unwrap_or(0)
    }

    fn gas_penalized(&self, tx_hash: &Hash) -> u64 {
        self.book.lock().penalized.get(tx_hash).copied().unwrap_or(0)
    }

    fn total_gas_provided(&self) -> u64 {
        sum(&self.book.lock().provided)
    }

    fn total_gas_refunded(&self) -> u64 {
        sum(&self.book.lock().refunded)
    }

    fn total_gas_penalized(&self) -> u64 {
        sum(&self.book.lock().penalized)
    }

    fn remove(&self, tx_hashes: &[Hash]) {
        let mut book = self.book.lock();
        for hash in tx_hashes {
            book.forget(hash);
        }
    }

    fn reset(&self, key: &Hash) {
        self.book.lock().touched_since_reset.insert(*key, Vec::new());
    }

    fn restore_gas_since_last_reset(&self, key: &Hash) {
        let mut book = self.book.lock();
        let touched = book.touched_since_reset.remove(key).unwrap_or_default();
        for hash in &touched {
            book.forget(hash);
        }
    }

    fn init(&self) {
        *self.book.lock() = GasBook::default();
    }
}
