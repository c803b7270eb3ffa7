//! Collaborator traits consumed by the bridge engine.
//!
//! Every external service the engine talks to (pools, VM capabilities,
//! gas and fee handlers, output sinks) is one of these traits. All of them
//! take `&self`: implementations are shared between interceptor, tracker
//! and block-processing threads and guard their own state.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use causeway_primitives::{
    Address, ContractCallInput, Hash, HeaderVariant, LogEntry, ResultTransaction, Round, ShardId,
    TxVariant, VmOutput,
};

use crate::error::HostError;
use crate::types::OutgoingOperationsBatch;

/// Callback invoked by the headers pool for every newly admitted header.
pub type HeaderHandler = Arc<dyn Fn(&Hash, &HeaderVariant) + Send + Sync>;

// ── Pools ──

/// Shared pool of headers keyed by hash.
pub trait HeadersPool: Send + Sync {
    /// Insert a header. Idempotent by hash: returns false, and changes
    /// nothing, if the hash is already present.
    ///
    /// Registered handlers are called once, on first insertion.
    fn add_header(&self, hash: Hash, header: HeaderVariant) -> bool;

    /// Look up a header by hash.
    fn get_header(&self, hash: &Hash) -> Option<HeaderVariant>;

    /// Subscribe to header admissions.
    fn register_handler(&self, handler: HeaderHandler);

    /// Number of stored headers.
    fn len(&self) -> usize;

    /// Returns true if the pool is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared pool of transactions, sharded by cache identifier.
pub trait TransactionPool: Send + Sync {
    /// Insert a transaction under `cache_id` with a size hint.
    fn add_data(&self, hash: Hash, tx: TxVariant, size: usize, cache_id: &str)
        -> Result<(), HostError>;

    /// Find a transaction in any cache.
    fn search_first(&self, hash: &Hash) -> Option<TxVariant>;
}

/// Store of outgoing bridge operations awaiting main-chain confirmation.
pub trait OutgoingOperationsPool: Send + Sync {
    /// Register a batch of operations under its hash of hashes.
    fn add(&self, batch: OutgoingOperationsBatch);

    /// Look up a batch.
    fn get(&self, hash_of_hashes: &[u8]) -> Option<OutgoingOperationsBatch>;

    /// Mark one operation of a batch as executed on the main chain.
    fn confirm_operation(&self, hash_of_hashes: &[u8], hash: &[u8]) -> Result<(), HostError>;
}

// ── VM capabilities ──

/// Blockchain hook: built-in function dispatch and execution counters.
pub trait BlockchainHook: Send + Sync {
    /// Execute a protocol built-in function.
    fn process_built_in_function(&self, input: &ContractCallInput) -> Result<VmOutput, HostError>;

    /// Reset the per-execution counters.
    fn reset_counters(&self);

    /// Counter values since the last reset.
    fn get_counter_values(&self) -> BTreeMap<String, u64>;
}

/// A virtual machine able to run contract calls.
pub trait VmExecutor: Send + Sync {
    /// Run a contract call. `Ok(None)` means the VM produced no output.
    fn run_smart_contract_call(&self, input: &ContractCallInput)
        -> Result<Option<VmOutput>, HostError>;
}

/// Registry of virtual machines, selected by contract address.
pub trait VmContainer: Send + Sync {
    /// Find the VM handling contracts at `address`.
    fn find_vm_by_address(&self, address: &Address) -> Result<Arc<dyn VmExecutor>, HostError>;
}

// ── Handlers ──

/// Pre-registers transaction hashes so their interception is accepted early.
pub trait WhitelistHandler: Send + Sync {
    fn add(&self, hashes: &[Hash]);
}

/// Per-transaction gas bookkeeping for the block being built.
pub trait GasHandler: Send + Sync {
    /// Gas a transaction consumes in its sender and receiver shards.
    fn compute_gas_provided_by_tx(
        &self,
        sender_shard: ShardId,
        receiver_shard: ShardId,
        tx: &TxVariant,
    ) -> Result<(u64, u64), HostError>;

    fn set_gas_provided(&self, gas: u64, tx_hash: Hash);
    fn set_gas_refunded(&self, gas: u64, tx_hash: Hash);
    fn set_gas_penalized(&self, gas: u64, tx_hash: Hash);

    fn gas_provided(&self, tx_hash: &Hash) -> u64;
    fn gas_refunded(&self, tx_hash: &Hash) -> u64;
    fn gas_penalized(&self, tx_hash: &Hash) -> u64;

    fn total_gas_provided(&self) -> u64;
    fn total_gas_refunded(&self) -> u64;
    fn total_gas_penalized(&self) -> u64;

    /// Forget every entry recorded for `tx_hashes`.
    fn remove(&self, tx_hashes: &[Hash]);

    /// Start recording which hashes are touched under `key`.
    fn reset(&self, key: &Hash);

    /// Drop every entry recorded since the last `reset(key)`.
    fn restore_gas_since_last_reset(&self, key: &Hash);

    /// Clear all bookkeeping, at the start of a block.
    fn init(&self);
}

/// Time-bounded cache of blacklisted hashes.
pub trait BlacklistCache: Send + Sync {
    /// Evict expired entries.
    fn sweep(&self);

    fn has(&self, key: &Hash) -> bool;

    /// Insert or refresh `key` for `span`.
    fn upsert(&self, key: Hash, span: Duration);
}

/// Rounds excluded from processing after a hardfork.
pub trait HardforkExclusionHandler: Send + Sync {
    fn is_round_excluded(&self, round: Round) -> bool;
}

// ── Output sinks ──

/// Persists the logs produced by a transaction.
pub trait TxLogsProcessor: Send + Sync {
    fn save_log(&self, tx_hash: &Hash, tx: &ResultTransaction, logs: &[LogEntry])
        -> Result<(), HostError>;
}

/// Cache of final VM outputs keyed by transaction hash.
pub trait VmOutputCache: Send + Sync {
    fn put(&self, tx_hash: Hash, output: VmOutput);
    fn get(&self, tx_hash: &Hash) -> Option<VmOutput>;
}

/// Collects result transactions created during execution.
pub trait IntermediateResultsForwarder: Send + Sync {
    fn add_intermediate_transactions(&self, txs: Vec<ResultTransaction>) -> Result<(), HostError>;
}

// ── Block settings ──

/// Fee and gas ceilings.
pub trait EconomicsFee: Send + Sync {
    /// Gas ceiling of a block in `shard`.
    fn max_gas_limit_per_block(&self, shard: ShardId) -> u64;

    /// Gas ceiling of one cross-shard mini-block in its receiver shard.
    fn max_gas_limit_per_mini_block_for_safe_cross_shard(&self) -> u64;
}

/// Feature flags activated by epoch.
pub trait EnableEpochsHandler: Send + Sync {
    fn is_optimize_gas_used_in_cross_mini_blocks_enabled(&self) -> bool;
    fn is_sc_processor_v2_enabled(&self) -> bool;
}

/// Block size accounting.
pub trait BlockSizeComputation: Send + Sync {
    /// Returns true if adding the given counts would exceed the block size.
    fn is_max_block_size_without_throttle_reached(&self, num_mini_blocks: usize, num_txs: usize)
        -> bool;

    fn add_num_mini_blocks(&self, n: usize);
    fn add_num_txs(&self, n: usize);

    /// Reset the counters at the start of a block.
    fn init(&self);
}

/// Tracks per-transaction processing results for the block being built.
pub trait PreProcessorExecutionInfoHandler {
    fn init_processed_txs_results(&self, key: &Hash);
    fn revert_processed_txs_results(&self, tx_hashes: &[Hash], key: &Hash);
}
