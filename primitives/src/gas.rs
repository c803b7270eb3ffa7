//! Block-level gas bookkeeping for incoming result transactions.
//!
//! A block has a gas ceiling per shard. The first mini-block destined to
//! this shard may use all of it; once something has been consumed, later
//! mini-blocks only get a percentage so several senders share the block.

use crate::error::{ChainError, ChainResult};

/// Share of the block ceiling available to mini-blocks after the first one.
pub const MAX_GAS_LIMIT_PERCENT_USED_FOR_DEST_ME_TXS: u64 = 50;

/// Running gas totals while a mini-block is being processed.
///
/// Additions are checked before being applied, so on error the totals are
/// left exactly as they were.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GasConsumedInfo {
    pub gas_consumed_by_mini_block_in_receiver_shard: u64,
    pub gas_consumed_by_mini_blocks_in_sender_shard: u64,
    pub total_gas_consumed_in_self_shard: u64,
}

impl GasConsumedInfo {
    /// Start bookkeeping for a new mini-block on top of what the block already used.
    pub fn starting_from(total_gas_consumed_in_self_shard: u64) -> Self {
        Self {
            total_gas_consumed_in_self_shard,
            ..Default::default()
        }
    }

    /// Account `gas` consumed in this (receiver) shard.
    ///
    /// Fails when the mini-block would exceed `max_per_mini_block` or the
    /// block would exceed `max_per_block`.
    pub fn consume_in_receiver_shard(
        &mut self,
        gas: u64,
        max_per_mini_block: u64,
        max_per_block: u64,
    ) -> ChainResult<()> {
        let mini_block_total = self
            .gas_consumed_by_mini_block_in_receiver_shard
            .checked_add(gas)
            .filter(|v| *v <= max_per_mini_block)
            .ok_or(ChainError::MaxGasLimitPerMiniBlockInReceiverShardIsReached {
                limit: max_per_mini_block,
                needed: self
                    .gas_consumed_by_mini_block_in_receiver_shard
                    .saturating_add(gas),
            })?;
        let block_total = self
            .total_gas_consumed_in_self_shard
            .checked_add(gas)
            .filter(|v| *v <= max_per_block)
            .ok_or(ChainError::MaxGasLimitPerBlockInSelfShardIsReached {
                limit: max_per_block,
                needed: self.total_gas_consumed_in_self_shard.saturating_add(gas),
            })?;

        self.gas_consumed_by_mini_block_in_receiver_shard = mini_block_total;
        self.total_gas_consumed_in_self_shard = block_total;
        Ok(())
    }

    /// Give back gas that was refunded or penalized after execution.
    ///
    /// Returns false, leaving the totals untouched, when `gas` exceeds
    /// either running total.
    pub fn release(&mut self, gas: u64) -> bool {
        if gas > self.total_gas_consumed_in_self_shard
            || gas > self.gas_consumed_by_mini_block_in_receiver_shard
        {
            return false;
        }
        self.gas_consumed_by_mini_block_in_receiver_shard -= gas;
        self.total_gas_consumed_in_self_shard -= gas;
        true
    }
}

/// Gas ceiling for cross-shard transactions destined to this shard.
///
/// `total_already_consumed == 0` means this is the first mini-block of the
/// block that targets us, which gets the full per-block ceiling.
pub fn max_gas_limit_used_for_dest_me_txs(
    max_gas_limit_per_block: u64,
    total_already_consumed: u64,
    percent: u64,
) -> u64 {
    if total_already_consumed == 0 {
        return max_gas_limit_per_block;
    }
    max_gas_limit_per_block.saturating_mul(percent) / 100
}
