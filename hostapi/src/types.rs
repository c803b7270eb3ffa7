//! Host-side settings and small collaborator implementations.
//!
//! `FeeSettings` bundles the gas ceilings of a block. `EpochFlags`,
//! `BlockSizeThrottle` and `RoundExclusions` are the in-process versions
//! of the epoch, block-size and hardfork collaborators.

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use causeway_primitives::{Round, ShardId};

use crate::traits::{BlockSizeComputation, EconomicsFee, EnableEpochsHandler, HardforkExclusionHandler};

/// One outgoing bridge operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutgoingOperation {
    pub hash: Vec<u8>,
    pub data: Vec<u8>,
    pub confirmed: bool,
}

/// Outgoing operations grouped under their hash of hashes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutgoingOperationsBatch {
    pub hash_of_hashes: Vec<u8>,
    pub operations: Vec<OutgoingOperation>,
}

impl OutgoingOperationsBatch {
    /// Returns true once every operation is confirmed.
    pub fn is_fully_confirmed(&self) -> bool {
        self.operations.iter().all(|op| op.confirmed)
    }
}

/// Gas ceilings for block building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeSettings {
    /// Gas ceiling of a block in a regular shard.
    pub max_gas_limit_per_block: u64,
    /// Gas ceiling of a block in the metachain.
    pub max_gas_limit_per_meta_block: u64,
    /// Gas ceiling of a cross-shard mini-block in its receiver shard.
    pub max_gas_limit_per_mini_block: u64,
}

impl Default for FeeSettings {
    fn default() -> Self {
        Self {
            max_gas_limit_per_block: 1_500_000_000,
            max_gas_limit_per_meta_block: 15_000_000_000,
            max_gas_limit_per_mini_block: 250_000_000,
        }
    }
}

impl FeeSettings {
    /// Settings with explicit block and mini-block ceilings.
    pub fn from_limits(max_gas_limit_per_block: u64, max_gas_limit_per_mini_block: u64) -> Self {
        Self {
            max_gas_limit_per_block,
            max_gas_limit_per_mini_block,
            ..Self::default()
        }
    }
}

impl EconomicsFee for FeeSettings {
    fn max_gas_limit_per_block(&self, shard: ShardId) -> u64 {
        if shard == causeway_primitives::METACHAIN_SHARD_ID {
            return self.max_gas_limit_per_meta_block;
        }
        self.max_gas_limit_per_block
    }

    fn max_gas_limit_per_mini_block_for_safe_cross_shard(&self) -> u64 {
        self.max_gas_limit_per_mini_block
    }
}

/// Feature flags, switchable at runtime.
#[derive(Debug, Default)]
pub struct EpochFlags {
    optimize_gas_used_in_cross_mini_blocks: AtomicBool,
    sc_processor_v2: AtomicBool,
}

impl EpochFlags {
    pub fn new(optimize_gas: bool, sc_processor_v2: bool) -> Self {
        Self {
            optimize_gas_used_in_cross_mini_blocks: AtomicBool::new(optimize_gas),
            sc_processor_v2: AtomicBool::new(sc_processor_v2),
        }
    }

    pub fn set_optimize_gas_used_in_cross_mini_blocks(&self, enabled: bool) {
        self.optimize_gas_used_in_cross_mini_blocks
            .store(enabled, Ordering::SeqCst);
    }

    pub fn set_sc_processor_v2(&self, enabled: bool) {
        self.sc_processor_v2.store(enabled, Ordering::SeqCst);
    }
}

impl EnableEpochsHandler for EpochFlags {
    fn is_optimize_gas_used_in_cross_mini_blocks_enabled(&self) -> bool {
        self.optimize_gas_used_in_cross_mini_blocks
            .load(Ordering::SeqCst)
    }

    fn is_sc_processor_v2_enabled(&self) -> bool {
        self.sc_processor_v2.load(Ordering::SeqCst)
    }
}

/// Block size accounting with fixed mini-block and transaction ceilings.
#[derive(Debug)]
pub struct BlockSizeThrottle {
    max_mini_blocks: usize,
    max_txs: usize,
    num_mini_blocks: AtomicUsize,
    num_txs: AtomicUsize,
}

impl BlockSizeThrottle {
    pub fn new(max_mini_blocks: usize, max_txs: usize) -> Self {
        Self {
            max_mini_blocks,
            max_txs,
            num_mini_blocks: AtomicUsize::new(0),
            num_txs: AtomicUsize::new(0),
        }
    }

    pub fn num_mini_blocks(&self) -> usize {
        self.num_mini_blocks.load(Ordering::SeqCst)
    }

    pub fn num_txs(&self) -> usize {
        self.num_txs.load(Ordering::SeqCst)
    }
}

impl Default for BlockSizeThrottle {
    fn default() -> Self {
        Self::new(usize::MAX, usize::MAX)
    }
}

impl BlockSizeComputation for BlockSizeThrottle {
    fn is_max_block_size_without_throttle_reached(
        &self,
        num_mini_blocks: usize,
        num_txs: usize,
    ) -> bool {
        self.num_mini_blocks().saturating_add(num_mini_blocks) > self.max_mini_blocks
            || self.num_txs().saturating_add(num_txs) > self.max_txs
    }

    fn add_num_mini_blocks(&self, n: usize) {
        self.num_mini_blocks.fetch_add(n, Ordering::SeqCst);
    }

    fn add_num_txs(&self, n: usize) {
        self.num_txs.fetch_add(n, Ordering::SeqCst);
    }

    fn init(&self) {
        self.num_mini_blocks.store(0, Ordering::SeqCst);
        self.num_txs.store(0, Ordering::SeqCst);
    }
}

/// Inclusive round ranges excluded after a hardfork.
#[derive(Debug, Clone, Default)]
pub struct RoundExclusions {
    ranges: Vec<RangeInclusive<Round>>,
}

impl RoundExclusions {
    pub fn new(ranges: Vec<RangeInclusive<Round>>) -> Self {
        Self { ranges }
    }
}

impl HardforkExclusionHandler for RoundExclusions {
    fn is_round_excluded(&self, round: Round) -> bool {
        self.ranges.iter().any(|r| r.contains(&round))
    }
}
