//! Extended header construction and pool admission.

use std::sync::Arc;

use causeway_hostapi::HeadersPool;
use causeway_primitives::types::short_hex;
use causeway_primitives::{
    calculate_hash, BridgeOperation, ExtendedHeader, Hash, Hasher, HeaderVariant, IncomingHeader,
    MiniBlock, MiniBlockType,
};
use tracing::debug;

use crate::error::{ProcessError, ProcessResult};
use crate::incoming::events::ScrInfo;

/// Build the extended header of an incoming main-chain header.
///
/// Result transactions are grouped into one mini-block per
/// `(sender, receiver)` shard pair, pairs ordered by first appearance and
/// hashes by arrival. The function is pure: the same inputs always give
/// the same canonical bytes.
pub fn create_extended_header(
    incoming: &IncomingHeader,
    scrs: &[ScrInfo],
    confirmed_bridge_ops: &[BridgeOperation],
) -> ProcessResult<ExtendedHeader> {
    let header = incoming.header.as_ref().ok_or(ProcessError::NilHeader)?;

    Ok(ExtendedHeader {
        header: header.clone(),
        incoming_mini_blocks: create_mini_blocks(scrs),
        incoming_events: incoming.events.clone(),
        confirmed_bridge_operations: confirmed_bridge_ops.to_vec(),
    })
}

fn create_mini_blocks(scrs: &[ScrInfo]) -> Vec<MiniBlock> {
    let mut mini_blocks: Vec<MiniBlock> = Vec::new();
    for info in scrs {
        let existing = mini_blocks.iter_mut().find(|mb| {
            mb.sender_shard_id == info.sender_shard_id
                && mb.receiver_shard_id == info.receiver_shard_id
        });
        match existing {
            Some(mb) => mb.tx_hashes.push(info.hash),
            None => mini_blocks.push(MiniBlock {
                tx_hashes: vec![info.hash],
                sender_shard_id: info.sender_shard_id,
                receiver_shard_id: info.receiver_shard_id,
                kind: MiniBlockType::SmartContractResultBlock,
            }),
        }
    }
    mini_blocks
}

/// Hashes extended headers and inserts them into the headers pool.
pub struct ExtendedHeaderProcessor {
    headers_pool: Arc<dyn HeadersPool>,
    hasher: Arc<dyn Hasher>,
}

impl ExtendedHeaderProcessor {
    pub fn new(headers_pool: Arc<dyn HeadersPool>, hasher: Arc<dyn Hasher>) -> Self {
        Self {
            headers_pool,
            hasher,
        }
    }

    /// Add `header` to the pool under the hash of its canonical encoding.
    pub fn add_extended_header_to_pool(&self, header: ExtendedHeader) -> ProcessResult<Hash> {
        let hash = calculate_hash(self.hasher.as_ref(), &header);
        let nonce = header.header.nonce;
        let added = self
            .headers_pool
            .add_header(hash, HeaderVariant::Extended(header));
        debug!(
            target: "incoming",
            hash = %short_hex(&hash),
            nonce,
            added,
            "extended header sent to pool"
        );
        Ok(hash)
    }
}
