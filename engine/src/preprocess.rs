//! Incoming result transactions at block level.
//!
//! `IncomingScrPreprocessor` runs the result transactions of mini-blocks
//! sent to this shard by the main chain. Two paths:
//!
//! - `process_mini_block` while proposing: resumable, gas and block-size
//!   bounded, full or partial execution
//! - `process_block_transactions` while validating a proposed block: runs
//!   exactly the range the proposer executed
//!
//! Each transaction runs against an account snapshot. A failure reverts
//! the accounts, the gas recorded for the transaction and its execution
//! info.

use std::collections::HashMap;
use std::sync::Arc;

use causeway_hostapi::{
    AccountsAdapter, BlockSizeComputation, EconomicsFee, EnableEpochsHandler, GasHandler,
    PreProcessorExecutionInfoHandler, Storer, TransactionPool,
};
use causeway_primitives::gas::max_gas_limit_used_for_dest_me_txs;
use causeway_primitives::types::short_hex;
use causeway_primitives::{
    calculate_hash, Body, CanonicalEncode, ChainError, ChainResult, GasConsumedInfo, Hash, Hasher,
    Header, MiniBlock, MiniBlockExecutionCursor, MiniBlockType, ResultTransaction,
    ShardCoordinator, ShardId, TxVariant,
};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{ProcessError, ProcessResult};
use crate::smart_contract::SmartContractProcessor;

/// Fail unless `first..=last` is a non-empty range of valid indexes below `max_index`.
pub fn check_if_indexes_are_out_of_bound(first: i32, last: i32, max_index: i32) -> ChainResult<()> {
    let first_out_of_range = first < 0 || first >= max_index;
    let last_out_of_range = last < 0 || last >= max_index;
    if first > last || first_out_of_range || last_out_of_range {
        return Err(ChainError::IndexOutOfBound {
            first,
            last,
            max_index,
        });
    }
    Ok(())
}

/// A result transaction known to the block being built, with its routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInfo {
    pub tx: ResultTransaction,
    pub sender_shard_id: ShardId,
    pub receiver_shard_id: ShardId,
}

/// How far a mini-block has been executed in previous blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessedMiniBlockInfo {
    pub fully_processed: bool,
    pub index_of_last_tx_processed: i32,
}

impl Default for ProcessedMiniBlockInfo {
    fn default() -> Self {
        Self {
            fully_processed: false,
            index_of_last_tx_processed: -1,
        }
    }
}

/// Execution progress of partially executed mini-blocks, by mini-block hash.
#[derive(Debug, Default)]
pub struct ProcessedMiniBlocksTracker {
    infos: RwLock<HashMap<Hash, ProcessedMiniBlockInfo>>,
}

impl ProcessedMiniBlocksTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_processed_mini_block_info(&self, mini_block_hash: Hash, info: ProcessedMiniBlockInfo) {
        self.infos.write().insert(mini_block_hash, info);
    }

    /// Progress of a mini-block; unknown mini-blocks start at index -1.
    pub fn get_processed_mini_block_info(&self, mini_block_hash: &Hash) -> ProcessedMiniBlockInfo {
        self.infos
            .read()
            .get(mini_block_hash)
            .copied()
            .unwrap_or_default()
    }

    pub fn is_mini_block_fully_processed(&self, mini_block_hash: &Hash) -> bool {
        self.get_processed_mini_block_info(mini_block_hash)
            .fully_processed
    }

    pub fn remove_mini_block_hash(&self, mini_block_hash: &Hash) {
        self.infos.write().remove(mini_block_hash);
    }
}

/// Result of `process_mini_block` once the mini-block passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiniBlockProcessingOutcome {
    /// Transactions executed successfully, in order.
    pub processed_tx_hashes: Vec<Hash>,
    /// Index of the last transaction the loop went through.
    pub index_of_last_tx_processed: i32,
    /// Set in full execution mode when a transaction failed: the caller
    /// must revert the mini-block.
    pub should_revert: bool,
    /// First error met while executing.
    pub error: Option<ProcessError>,
}

/// Collaborators of [`IncomingScrPreprocessor`].
pub struct ScrPreprocessorArgs {
    pub scr_pool: Arc<dyn TransactionPool>,
    pub storer: Arc<dyn Storer>,
    pub sc_processor: Arc<dyn SmartContractProcessor>,
    pub accounts: Arc<dyn AccountsAdapter>,
    pub gas_handler: Arc<dyn GasHandler>,
    pub economics_fee: Arc<dyn EconomicsFee>,
    pub enable_epochs: Arc<dyn EnableEpochsHandler>,
    pub block_size: Arc<dyn BlockSizeComputation>,
    pub shard_coordinator: Arc<dyn ShardCoordinator>,
    pub hasher: Arc<dyn Hasher>,
    pub processed_mini_blocks: Arc<ProcessedMiniBlocksTracker>,
    pub max_gas_limit_percent_used_for_dest_me_txs: u64,
}

/// Block-level processor of incoming result transactions.
pub struct IncomingScrPreprocessor {
    scr_pool: Arc<dyn TransactionPool>,
    storer: Arc<dyn Storer>,
    sc_processor: Arc<dyn SmartContractProcessor>,
    accounts: Arc<dyn AccountsAdapter>,
    gas_handler: Arc<dyn GasHandler>,
    economics_fee: Arc<dyn EconomicsFee>,
    enable_epochs: Arc<dyn EnableEpochsHandler>,
    block_size: Arc<dyn BlockSizeComputation>,
    shard_coordinator: Arc<dyn ShardCoordinator>,
    hasher: Arc<dyn Hasher>,
    processed_mini_blocks: Arc<ProcessedMiniBlocksTracker>,
    max_gas_limit_percent_used_for_dest_me_txs: u64,
    txs_for_block: RwLock<HashMap<Hash, TxInfo>>,
}

impl IncomingScrPreprocessor {
    pub fn new(args: ScrPreprocessorArgs) -> Self {
        Self {
            scr_pool: args.scr_pool,
            storer: args.storer,
            sc_processor: args.sc_processor,
            accounts: args.accounts,
            gas_handler: args.gas_handler,
            economics_fee: args.economics_fee,
            enable_epochs: args.enable_epochs,
            block_size: args.block_size,
            shard_coordinator: args.shard_coordinator,
            hasher: args.hasher,
            processed_mini_blocks: args.processed_mini_blocks,
            max_gas_limit_percent_used_for_dest_me_txs: args.max_gas_limit_percent_used_for_dest_me_txs,
            txs_for_block: RwLock::new(HashMap::new()),
        }
    }

    /// Forget the transactions of the previous block.
    pub fn create_block_started(&self) {
        self.txs_for_block.write().clear();
    }

    /// Execute the transactions of `mini_block` after `index_of_last_tx_processed`.
    ///
    /// `Err` means the mini-block was rejected before anything ran. Errors
    /// met while executing are reported in the outcome: in full mode the
    /// loop stops at the first one, in partial mode a failed transaction
    /// is reverted and the loop goes on. Time and gas limits stop the loop
    /// in both modes.
    pub fn process_mini_block(
        &self,
        mini_block: &MiniBlock,
        have_time: &dyn Fn() -> bool,
        partial_mb_execution_mode: bool,
        index_of_last_tx_processed: i32,
        exec_info: &dyn PreProcessorExecutionInfoHandler,
    ) -> ProcessResult<MiniBlockProcessingOutcome> {
        if mini_block.kind != MiniBlockType::SmartContractResultBlock {
            return Err(ProcessError::WrongTypeInMiniBlock);
        }

        let num_txs = mini_block.tx_hashes.len() as i32;
        let index_of_first_tx_to_be_processed = index_of_last_tx_processed.saturating_add(1);
        check_if_indexes_are_out_of_bound(index_of_first_tx_to_be_processed, num_txs - 1, num_txs)?;

        let (scrs, tx_hashes) = self.get_all_scrs_from_mini_block(mini_block, have_time)?;

        if self
            .block_size
            .is_max_block_size_without_throttle_reached(1, mini_block.tx_hashes.len())
        {
            return Err(ProcessError::MaxBlockSizeReached);
        }

        let mut gas_info = GasConsumedInfo::starting_from(self.total_gas_consumed());
        let max_gas_limit_used_for_dest_me_txs = max_gas_limit_used_for_dest_me_txs(
            self.economics_fee
                .max_gas_limit_per_block(self.shard_coordinator.self_id()),
            gas_info.total_gas_consumed_in_self_shard,
            self.max_gas_limit_percent_used_for_dest_me_txs,
        );

        debug!(
            target: "preprocess",
            total_gas_consumed_in_self_shard = gas_info.total_gas_consumed_in_self_shard,
            total_gas_provided = self.gas_handler.total_gas_provided(),
            total_gas_refunded = self.gas_handler.total_gas_refunded(),
            total_gas_penalized = self.gas_handler.total_gas_penalized(),
            "process mini block: before processing"
        );

        let mut processed_tx_hashes = Vec::new();
        let mut error = None;
        let mut tx_index = index_of_first_tx_to_be_processed as usize;
        while tx_index < scrs.len() {
            let tx_hash = tx_hashes[tx_index];
            let result = self.process_scr_of_mini_block(
                mini_block,
                &scrs[tx_index],
                tx_hash,
                have_time,
                &mut gas_info,
                max_gas_limit_used_for_dest_me_txs,
                exec_info,
            );
            match result {
                Ok(()) => processed_tx_hashes.push(tx_hash),
                Err(err) => {
                    debug!(
                        target: "preprocess",
                        tx_hash = %short_hex(&tx_hash),
                        index = tx_index,
                        error = %err,
                        "result transaction failed"
                    );
                    let stop = err.stops_processing() || !partial_mb_execution_mode;
                    error.get_or_insert(err);
                    if stop {
                        break;
                    }
                }
            }
            tx_index += 1;
        }
        let index_of_last_tx_processed = tx_index as i32 - 1;

        debug!(
            target: "preprocess",
            total_gas_consumed_in_self_shard = gas_info.total_gas_consumed_in_self_shard,
            gas_consumed_by_mini_block_in_receiver_shard = gas_info.gas_consumed_by_mini_block_in_receiver_shard,
            num_scrs_processed = processed_tx_hashes.len(),
            total_gas_provided = self.gas_handler.total_gas_provided(),
            "process mini block: after processing"
        );

        if error.is_some() && !partial_mb_execution_mode {
            return Ok(MiniBlockProcessingOutcome {
                processed_tx_hashes,
                index_of_last_tx_processed,
                should_revert: true,
                error,
            });
        }

        {
            let mut txs_for_block = self.txs_for_block.write();
            for (tx_hash, scr) in tx_hashes.iter().zip(scrs) {
                txs_for_block.insert(
                    *tx_hash,
                    TxInfo {
                        tx: scr,
                        sender_shard_id: mini_block.sender_shard_id,
                        receiver_shard_id: mini_block.receiver_shard_id,
                    },
                );
            }
        }
        self.block_size.add_num_mini_blocks(1);
        self.block_size.add_num_txs(mini_block.tx_hashes.len());

        Ok(MiniBlockProcessingOutcome {
            processed_tx_hashes,
            index_of_last_tx_processed,
            should_revert: false,
            error,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn process_scr_of_mini_block(
        &self,
        mini_block: &MiniBlock,
        scr: &ResultTransaction,
        tx_hash: Hash,
        have_time: &dyn Fn() -> bool,
        gas_info: &mut GasConsumedInfo,
        max_gas_limit_used_for_dest_me_txs: u64,
        exec_info: &dyn PreProcessorExecutionInfoHandler,
    ) -> ProcessResult<()> {
        if !have_time() {
            return Err(ProcessError::TimeIsOut);
        }

        let gas_before = *gas_info;
        let gas_provided_in_self_shard = self.compute_gas_provided(
            mini_block.sender_shard_id,
            mini_block.receiver_shard_id,
            scr,
            gas_info,
        )?;

        if self
            .enable_epochs
            .is_optimize_gas_used_in_cross_mini_blocks_enabled()
            && gas_info.total_gas_consumed_in_self_shard > max_gas_limit_used_for_dest_me_txs
        {
            return Err(ProcessError::MaxGasLimitUsedForDestMeTxsIsReached);
        }

        let snapshot = self.handle_process_transaction_init(exec_info, &tx_hash);
        if let Err(err) = self.sc_processor.process_smart_contract_result(Some(scr)) {
            self.handle_process_transaction_error(exec_info, snapshot, &tx_hash);
            *gas_info = gas_before;
            return Err(err);
        }

        self.update_gas_consumed_with_gas_refunded_and_gas_penalized(&tx_hash, gas_info);
        self.gas_handler
            .set_gas_provided(gas_provided_in_self_shard, tx_hash);
        Ok(())
    }

    fn compute_gas_provided(
        &self,
        sender_shard_id: ShardId,
        receiver_shard_id: ShardId,
        scr: &ResultTransaction,
        gas_info: &mut GasConsumedInfo,
    ) -> ProcessResult<u64> {
        let tx = TxVariant::Result(scr.clone());
        let (gas_in_sender_shard, gas_in_receiver_shard) = self
            .gas_handler
            .compute_gas_provided_by_tx(sender_shard_id, receiver_shard_id, &tx)?;

        let self_id = self.shard_coordinator.self_id();
        let gas_in_self_shard = if sender_shard_id == self_id {
            gas_in_sender_shard
        } else {
            gas_in_receiver_shard
        };

        gas_info.consume_in_receiver_shard(
            gas_in_self_shard,
            self.economics_fee
                .max_gas_limit_per_mini_block_for_safe_cross_shard(),
            self.economics_fee.max_gas_limit_per_block(self_id),
        )?;
        Ok(gas_in_self_shard)
    }

    fn update_gas_consumed_with_gas_refunded_and_gas_penalized(
        &self,
        tx_hash: &Hash,
        gas_info: &mut GasConsumedInfo,
    ) {
        let gas_to_be_subtracted = self
            .gas_handler
            .gas_refunded(tx_hash)
            .saturating_add(self.gas_handler.gas_penalized(tx_hash));
        if !gas_info.release(gas_to_be_subtracted) {
            debug!(
                target: "preprocess",
                tx_hash = %short_hex(tx_hash),
                gas_to_be_subtracted,
                "refunded and penalized gas exceeds consumed gas"
            );
        }
    }

    /// Gas consumed so far in this shard by the block being built.
    pub fn total_gas_consumed(&self) -> u64 {
        let total_gas_provided = self.gas_handler.total_gas_provided();
        if !self
            .enable_epochs
            .is_optimize_gas_used_in_cross_mini_blocks_enabled()
        {
            return total_gas_provided;
        }

        let total_gas_to_be_subtracted = self
            .gas_handler
            .total_gas_refunded()
            .saturating_add(self.gas_handler.total_gas_penalized());
        total_gas_provided.saturating_sub(total_gas_to_be_subtracted)
    }

    fn handle_process_transaction_init(
        &self,
        exec_info: &dyn PreProcessorExecutionInfoHandler,
        tx_hash: &Hash,
    ) -> usize {
        let snapshot = self.accounts.journal_len();
        exec_info.init_processed_txs_results(tx_hash);
        self.gas_handler.reset(tx_hash);
        snapshot
    }

    fn handle_process_transaction_error(
        &self,
        exec_info: &dyn PreProcessorExecutionInfoHandler,
        snapshot: usize,
        tx_hash: &Hash,
    ) {
        self.gas_handler.restore_gas_since_last_reset(tx_hash);
        if let Err(err) = self.accounts.revert_to_snapshot(snapshot) {
            warn!(target: "preprocess", snapshot, error = %err, "revert to snapshot failed");
        }
        exec_info.revert_processed_txs_results(&[*tx_hash], tx_hash);
    }

    /// Fetch every result transaction of `mini_block` from the pool, in order.
    pub fn get_all_scrs_from_mini_block(
        &self,
        mini_block: &MiniBlock,
        have_time: &dyn Fn() -> bool,
    ) -> ProcessResult<(Vec<ResultTransaction>, Vec<Hash>)> {
        let mut scrs = Vec::with_capacity(mini_block.tx_hashes.len());
        let mut tx_hashes = Vec::with_capacity(mini_block.tx_hashes.len());
        for tx_hash in &mini_block.tx_hashes {
            if !have_time() {
                return Err(ProcessError::TimeIsOut);
            }
            let tx = self
                .scr_pool
                .search_first(tx_hash)
                .ok_or(ProcessError::MissingTransaction)?;
            scrs.push(tx.as_result()?.clone());
            tx_hashes.push(*tx_hash);
        }
        Ok((scrs, tx_hashes))
    }

    /// Re-execute the result transactions of a proposed block.
    ///
    /// Only mini-blocks sent to this shard from another one are run, from
    /// where previous blocks stopped up to where the proposer stopped.
    /// Returns the mini-blocks that were executed.
    pub fn process_block_transactions(
        &self,
        header: &Header,
        body: &Body,
        have_time: &dyn Fn() -> bool,
    ) -> ProcessResult<Vec<MiniBlock>> {
        info!(
            target: "preprocess",
            nonce = header.nonce,
            num_mini_blocks = body.mini_blocks.len(),
            "process block transactions"
        );

        let mut processed = Vec::new();
        for mini_block in &body.mini_blocks {
            if !self.is_incoming_scr_mini_block(mini_block) {
                continue;
            }

            let cursor = self.indexes_of_last_tx_processed(mini_block, header)?;
            let index_of_first_tx_to_be_processed = cursor.index_of_last_tx_processed.saturating_add(1);
            check_if_indexes_are_out_of_bound(
                index_of_first_tx_to_be_processed,
                cursor.index_of_last_tx_processed_by_proposer,
                mini_block.tx_hashes.len() as i32,
            )?;

            for index in index_of_first_tx_to_be_processed..=cursor.index_of_last_tx_processed_by_proposer {
                if !have_time() {
                    return Err(ProcessError::TimeIsOut);
                }
                let tx_hash = mini_block
                    .tx_hashes
                    .get(index as usize)
                    .ok_or(ProcessError::MissingTransaction)?;
                let scr = self
                    .txs_for_block
                    .read()
                    .get(tx_hash)
                    .map(|info| info.tx.clone());
                let Some(scr) = scr else {
                    warn!(target: "preprocess", tx_hash = %short_hex(tx_hash), "missing transaction in process block transactions");
                    return Err(ProcessError::MissingTransaction);
                };

                self.sc_processor.process_smart_contract_result(Some(&scr))?;
            }

            processed.push(mini_block.clone());
        }
        Ok(processed)
    }

    fn indexes_of_last_tx_processed(
        &self,
        mini_block: &MiniBlock,
        header: &Header,
    ) -> ProcessResult<MiniBlockExecutionCursor> {
        let mini_block_hash = calculate_hash(self.hasher.as_ref(), mini_block);
        let info = self
            .processed_mini_blocks
            .get_processed_mini_block_info(&mini_block_hash);
        let mini_block_header = header
            .mini_block_header(&mini_block_hash)
            .ok_or(ProcessError::MissingMiniBlockHeader)?;

        Ok(MiniBlockExecutionCursor {
            index_of_last_tx_processed: info.index_of_last_tx_processed,
            index_of_last_tx_processed_by_proposer: mini_block_header.index_of_last_tx_processed,
        })
    }

    fn is_incoming_scr_mini_block(&self, mini_block: &MiniBlock) -> bool {
        let self_id = self.shard_coordinator.self_id();
        mini_block.kind == MiniBlockType::SmartContractResultBlock
            && mini_block.receiver_shard_id == self_id
            && mini_block.sender_shard_id != self_id
    }

    /// Load the result transactions of `body` from the pool.
    ///
    /// Returns how many are missing. Incoming transactions cannot be
    /// requested from peers, so missing ones are only logged.
    pub fn request_block_transactions(&self, body: &Body) -> usize {
        let mut missing = Vec::new();
        let mut txs_for_block = self.txs_for_block.write();
        for mini_block in body
            .mini_blocks
            .iter()
            .filter(|mb| self.is_incoming_scr_mini_block(mb))
        {
            for tx_hash in &mini_block.tx_hashes {
                match self.scr_pool.search_first(tx_hash) {
                    Some(TxVariant::Result(scr)) => {
                        txs_for_block.insert(
                            *tx_hash,
                            TxInfo {
                                tx: scr,
                                sender_shard_id: mini_block.sender_shard_id,
                                receiver_shard_id: mini_block.receiver_shard_id,
                            },
                        );
                    }
                    _ => missing.push(short_hex(tx_hash)),
                }
            }
        }
        if !missing.is_empty() {
            warn!(target: "preprocess", ?missing, "missing incoming result transactions, request not supported");
        }
        missing.len()
    }

    /// Persist the result transactions of `body`, keyed by hash.
    pub fn save_txs_to_storage(&self, body: &Body) -> ProcessResult<()> {
        for mini_block in body
            .mini_blocks
            .iter()
            .filter(|mb| self.is_incoming_scr_mini_block(mb))
        {
            for tx_hash in &mini_block.tx_hashes {
                let info = self
                    .processed_tx(tx_hash)
                    .ok_or(ProcessError::MissingTransaction)?;
                self.storer.put(tx_hash, info.tx.to_canonical_bytes())?;
            }
        }
        Ok(())
    }

    /// A transaction recorded for the block being built.
    pub fn processed_tx(&self, tx_hash: &Hash) -> Option<TxInfo> {
        self.txs_for_block.read().get(tx_hash).cloned()
    }

    /// Hashes of every transaction recorded for the block being built, sorted.
    pub fn processed_txs(&self) -> Vec<Hash> {
        let mut hashes: Vec<Hash> = self.txs_for_block.read().keys().copied().collect();
        hashes.sort_unstable();
        hashes
    }
}
