//! Address-to-shard routing.

use crate::types::{Address, ShardId, SOVEREIGN_CHAIN_SHARD_ID};

/// Maps addresses to shards and knows which shard this node runs.
pub trait ShardCoordinator: Send + Sync {
    /// Shard that owns `address`.
    fn compute_id(&self, address: &Address) -> ShardId;

    /// Shard this node belongs to.
    fn self_id(&self) -> ShardId;

    /// Number of shards in the network.
    fn number_of_shards(&self) -> u32;

    /// Returns true if `address` is owned by this node's shard.
    fn is_self(&self, address: &Address) -> bool {
        self.compute_id(address) == self.self_id()
    }
}

/// Coordinator for a sovereign chain: a single shard owns every address.
#[derive(Debug, Clone, Copy, Default)]
pub struct SovereignShardCoordinator;

impl ShardCoordinator for SovereignShardCoordinator {
    fn compute_id(&self, _address: &Address) -> ShardId {
        SOVEREIGN_CHAIN_SHARD_ID
    }

    fn self_id(&self) -> ShardId {
        SOVEREIGN_CHAIN_SHARD_ID
    }

    fn number_of_shards(&self) -> u32 {
        1
    }
}

/// Coordinator splitting addresses over `n` shards by the low bits of the
/// last address byte.
#[derive(Debug, Clone, Copy)]
pub struct MultiShardCoordinator {
    number_of_shards: u32,
    self_id: ShardId,
    mask_high: u32,
    mask_low: u32,
}

impl MultiShardCoordinator {
    /// Create a coordinator. Returns `None` for zero shards or an out-of-range self id.
    pub fn new(number_of_shards: u32, self_id: ShardId) -> Option<Self> {
        if number_of_shards == 0 || self_id >= number_of_shards {
            return None;
        }
        let bits = u32::BITS - (number_of_shards - 1).leading_zeros();
        let mask_high = (1u32 << bits) - 1;
        let mask_low = if bits == 0 { 0 } else { (1u32 << (bits - 1)) - 1 };
        Some(Self {
            number_of_shards,
            self_id,
            mask_high,
            mask_low,
        })
    }
}

impl ShardCoordinator for MultiShardCoordinator {
    fn compute_id(&self, address: &Address) -> ShardId {
        let last = address[address.len() - 1] as u32;
        let shard = last & self.mask_high;
        if shard > self.number_of_shards - 1 {
            return last & self.mask_low;
        }
        shard
    }

    fn self_id(&self) -> ShardId {
        self.self_id
    }

    fn number_of_shards(&self) -> u32 {
        self.number_of_shards
    }
}
