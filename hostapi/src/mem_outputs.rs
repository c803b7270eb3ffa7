//! In-memory output sinks: transaction logs, VM output cache, produced
//! result transactions and execution-info tracking.

use std::collections::HashMap;

use causeway_primitives::{Hash, LogEntry, ResultTransaction, VmOutput};
use parking_lot::{Mutex, RwLock};

use crate::error::HostError;
use crate::traits::{IntermediateResultsForwarder, PreProcessorExecutionInfoHandler, TxLogsProcessor, VmOutputCache};

/// Transaction logs keyed by transaction hash.
#[derive(Default)]
pub struct MemTxLogs {
    logs: RwLock<HashMap<Hash, Vec<LogEntry>>>,
}

impl MemTxLogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_log(&self, tx_hash: &Hash) -> Option<Vec<LogEntry>> {
        self.logs.read().get(tx_hash).cloned()
    }

    pub fn len(&self) -> usize {
        self.logs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TxLogsProcessor for MemTxLogs {
    fn save_log(
        &self,
        tx_hash: &Hash,
        _tx: &ResultTransaction,
        logs: &[LogEntry],
    ) -> Result<(), HostError> {
        if logs.is_empty() {
            return Ok(());
        }
        self.logs
            .write()
            .entry(*tx_hash)
            .or_default()
            .extend_from_slice(logs);
        Ok(())
    }
}

/// VM outputs keyed by transaction hash.
#[derive(Default)]
pub struct MemVmOutputCache {
    outputs: RwLock<HashMap<Hash, VmOutput>>,
}

impl MemVmOutputCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.outputs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VmOutputCache for MemVmOutputCache {
    fn put(&self, tx_hash: Hash, output: VmOutput) {
        self.outputs.write().insert(tx_hash, output);
    }

    fn get(&self, tx_hash: &Hash) -> Option<VmOutput> {
        self.outputs.read().get(tx_hash).cloned()
    }
}

/// Collects produced result transactions in arrival order.
#[derive(Default)]
pub struct MemResultsForwarder {
    txs: Mutex<Vec<ResultTransaction>>,
}

impl MemResultsForwarder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything forwarded so far.
    pub fn all(&self) -> Vec<ResultTransaction> {
        self.txs.lock().clone()
    }

    /// Drain the forwarded transactions.
    pub fn take(&self) -> Vec<ResultTransaction> {
        std::mem::take(&mut *self.txs.lock())
    }
}

impl IntermediateResultsForwarder for MemResultsForwarder {
    fn add_intermediate_transactions(&self, txs: Vec<ResultTransaction>) -> Result<(), HostError> {
        self.txs.lock().extend(txs);
        Ok(())
    }
}

/// Counts how many transactions were started and how many reverted.
#[derive(Default)]
pub struct ExecutionInfoCounter {
    started: Mutex<Vec<Hash>>,
    reverted: Mutex<Vec<Hash>>,
}

impl ExecutionInfoCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> Vec<Hash> {
        self.started.lock().clone()
    }

    pub fn reverted(&self) -> Vec<Hash> {
        self.reverted.lock().clone()
    }
}

impl PreProcessorExecutionInfoHandler for ExecutionInfoCounter {
    fn init_processed_txs_results(&self, key: &Hash) {
        self.started.lock().push(*key);
    }

    fn revert_processed_txs_results(&self, tx_hashes: &[Hash], _key: &Hash) {
        self.reverted.lock().extend_from_slice(tx_hashes);
    }
}
