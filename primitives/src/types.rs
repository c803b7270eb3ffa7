//! Core type aliases and constants shared by every Causeway crate.

/// 32-byte hash used for header hashes, mini-block hashes and transaction hashes.
pub type Hash = [u8; 32];

/// 32-byte account address.
pub type Address = [u8; 32];

/// Shard identifier.
pub type ShardId = u32;

/// Block nonce (monotonically increasing along a chain).
pub type Nonce = u64;

/// Consensus round.
pub type Round = u64;

/// Epoch number.
pub type Epoch = u32;

/// Shard id of the locally built sovereign chain.
pub const SOVEREIGN_CHAIN_SHARD_ID: ShardId = 0;

/// Shard id used for everything originating on the bridged main chain.
pub const MAIN_CHAIN_SHARD_ID: ShardId = 0xFFFF_FFF0;

/// Metachain shard id.
pub const METACHAIN_SHARD_ID: ShardId = u32::MAX;

/// A zero-valued hash (32 zero bytes).
pub const ZERO_HASH: Hash = [0u8; 32];

/// A zero-valued address (32 zero bytes).
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// System account that issues incoming ESDT transfers on the sovereign side.
pub const ESDT_SYSTEM_ADDRESS: Address = {
    let mut addr = [0u8; 32];
    addr[30] = 0xff;
    addr[31] = 0xff;
    addr
};

/// Convert a `Hash` to a hex string for display purposes.
pub fn hash_to_hex(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash))
}

/// Short hex form for log lines (first 8 bytes).
pub fn short_hex(bytes: &[u8]) -> String {
    hex::encode(&bytes[..bytes.len().min(8)])
}

/// Cache identifier for a (sender, receiver) shard pair, as used by shared pools.
pub fn shard_cache_id(sender: ShardId, receiver: ShardId) -> String {
    if sender == receiver {
        return sender.to_string();
    }
    format!("{}_{}", sender, receiver)
}

/// Interpret big-endian bytes as a `u64`, `None` if it does not fit.
pub fn be_bytes_to_u64(bytes: &[u8]) -> Option<u64> {
    let trimmed: &[u8] = match bytes.iter().position(|b| *b != 0) {
        Some(first) => &bytes[first..],
        None => &[],
    };
    if trimmed.len() > 8 {
        return None;
    }
    Some(trimmed.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
}

/// Interpret big-endian bytes as a `u128`, `None` if it does not fit.
pub fn be_bytes_to_u128(bytes: &[u8]) -> Option<u128> {
    let trimmed: &[u8] = match bytes.iter().position(|b| *b != 0) {
        Some(first) => &bytes[first..],
        None => &[],
    };
    if trimmed.len() > 16 {
        return None;
    }
    Some(trimmed.iter().fold(0u128, |acc, b| (acc << 8) | *b as u128))
}

/// Minimal big-endian encoding of an unsigned integer (empty for zero).
pub fn u128_to_min_be_bytes(v: u128) -> Vec<u8> {
    let bytes = v.to_be_bytes();
    match bytes.iter().position(|b| *b != 0) {
        Some(first) => bytes[first..].to_vec(),
        None => Vec::new(),
    }
}
