//! Cross-chain event decoding.
//!
//! Main-chain events come in two kinds:
//!
//! - `deposit`: tokens locked on the main chain for a sovereign receiver.
//!   Each deposit becomes one result transaction that transfers the tokens
//!   (and optionally calls a function) on the sovereign side.
//! - `executedBridgeOp`: the main chain executed an outgoing bridge
//!   operation; the matching entry of the outgoing pool is confirmed.
//!
//! Topics of a deposit: `[receiver, (token, nonce, value)+]`.
//! Data of a deposit: `@nonce@gasLimit@function[@args...]`, with the nonce
//! and gas limit as raw big-endian bytes. The hex-encoded call is appended
//! to the transfer call data unchanged.

use std::sync::Arc;

use causeway_hostapi::{OutgoingOperationsPool, TransactionPool};
use causeway_primitives::types::{
    be_bytes_to_u64, shard_cache_id, short_hex, u128_to_min_be_bytes,
};
use causeway_primitives::{
    calculate_hash, Address, BridgeOperation, Hash, Hasher, IncomingEvent, ResultTransaction,
    ShardId, TxVariant, ESDT_SYSTEM_ADDRESS, MAIN_CHAIN_SHARD_ID, SOVEREIGN_CHAIN_SHARD_ID,
};
use tracing::{debug, trace};

use crate::error::{ProcessError, ProcessResult};

/// Identifier of a token deposit event.
pub const EVENT_ID_DEPOSIT: &[u8] = b"deposit";

/// Identifier of a confirmed outgoing bridge operation.
pub const EVENT_ID_EXECUTED_BRIDGE_OP: &[u8] = b"executedBridgeOp";

/// Built-in function used to deliver deposited tokens.
pub const MULTI_ESDT_NFT_TRANSFER: &str = "MultiESDTNFTTransfer";

const MIN_TOPICS_IN_DEPOSIT: usize = 4;
const TOPICS_PER_TRANSFER: usize = 3;
const MIN_TOKENS_IN_DEPOSIT_DATA: usize = 4;
const NUM_TOPICS_IN_BRIDGE_OP: usize = 2;
const ARG_SEPARATOR: u8 = b'@';

/// A result transaction created from a deposit, with its routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrInfo {
    pub scr: ResultTransaction,
    pub hash: Hash,
    pub sender_shard_id: ShardId,
    pub receiver_shard_id: ShardId,
}

/// Everything decoded from the events of one incoming header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedEvents {
    pub scrs: Vec<ScrInfo>,
    pub confirmed_bridge_ops: Vec<BridgeOperation>,
}

struct DepositData {
    nonce: u64,
    gas_limit: u64,
    call: Vec<u8>,
}

/// Turns incoming events into result transactions and bridge confirmations.
pub struct IncomingEventsProcessor {
    tx_pool: Arc<dyn TransactionPool>,
    outgoing_pool: Arc<dyn OutgoingOperationsPool>,
    hasher: Arc<dyn Hasher>,
}

impl IncomingEventsProcessor {
    pub fn new(
        tx_pool: Arc<dyn TransactionPool>,
        outgoing_pool: Arc<dyn OutgoingOperationsPool>,
        hasher: Arc<dyn Hasher>,
    ) -> Self {
        Self {
            tx_pool,
            outgoing_pool,
            hasher,
        }
    }

    /// Decode every event, failing on the first malformed one.
    pub fn process_incoming_events(&self, events: &[IncomingEvent]) -> ProcessResult<ProcessedEvents> {
        let mut processed = ProcessedEvents::default();

        for (index, event) in events.iter().enumerate() {
            match event.identifier.as_slice() {
                EVENT_ID_DEPOSIT => {
                    let scr = self.create_scr_info(index, event)?;
                    processed.scrs.push(scr);
                }
                EVENT_ID_EXECUTED_BRIDGE_OP => {
                    processed
                        .confirmed_bridge_ops
                        .push(bridge_operation(index, event)?);
                }
                other => {
                    return Err(invalid(
                        index,
                        format!("unknown event identifier {:?}", String::from_utf8_lossy(other)),
                    ))
                }
            }
        }

        trace!(
            target: "incoming",
            scrs = processed.scrs.len(),
            bridge_ops = processed.confirmed_bridge_ops.len(),
            "incoming events processed"
        );
        Ok(processed)
    }

    /// Confirm executed operations in the outgoing pool. Failures are logged
    /// and skipped.
    pub fn add_confirmed_bridge_ops_to_pool(&self, ops: &[BridgeOperation]) {
        for op in ops {
            if let Err(err) = self.outgoing_pool.confirm_operation(&op.hash_of_hashes, &op.hash) {
                debug!(
                    target: "incoming",
                    hash_of_hashes = %short_hex(&op.hash_of_hashes),
                    hash = %short_hex(&op.hash),
                    error = %err,
                    "could not confirm bridge operation"
                );
            }
        }
    }

    /// Insert the result transactions into the transaction pool.
    pub fn add_scrs_to_pool(&self, scrs: &[ScrInfo]) -> ProcessResult<()> {
        let cache_id = shard_cache_id(MAIN_CHAIN_SHARD_ID, SOVEREIGN_CHAIN_SHARD_ID);
        for info in scrs {
            self.tx_pool.add_data(
                info.hash,
                TxVariant::Result(info.scr.clone()),
                info.scr.size(),
                &cache_id,
            )?;
        }
        Ok(())
    }

    fn create_scr_info(&self, index: usize, event: &IncomingEvent) -> ProcessResult<ScrInfo> {
        let topics = &event.topics;
        if topics.len() < MIN_TOPICS_IN_DEPOSIT || (topics.len() - 1) % TOPICS_PER_TRANSFER != 0 {
            return Err(invalid(
                index,
                format!("deposit has {} topics", topics.len()),
            ));
        }
        let receiver: Address = topics[0]
            .as_slice()
            .try_into()
            .map_err(|_| invalid(index, format!("receiver has {} bytes", topics[0].len())))?;

        let deposit = parse_deposit_data(index, &event.data)?;

        let scr = ResultTransaction {
            nonce: deposit.nonce,
            value: 0,
            receiver,
            sender: ESDT_SYSTEM_ADDRESS,
            data: transfer_call_data(&topics[1..], &deposit.call),
            gas_limit: deposit.gas_limit,
            ..Default::default()
        };
        let hash = calculate_hash(self.hasher.as_ref(), &scr);

        Ok(ScrInfo {
            scr,
            hash,
            sender_shard_id: MAIN_CHAIN_SHARD_ID,
            receiver_shard_id: SOVEREIGN_CHAIN_SHARD_ID,
        })
    }
}

fn bridge_operation(index: usize, event: &IncomingEvent) -> ProcessResult<BridgeOperation> {
    if event.topics.len() != NUM_TOPICS_IN_BRIDGE_OP {
        return Err(invalid(
            index,
            format!("executed bridge operation has {} topics", event.topics.len()),
        ));
    }
    Ok(BridgeOperation {
        hash_of_hashes: event.topics[0].clone(),
        hash: event.topics[1].clone(),
    })
}

fn parse_deposit_data(index: usize, data: &[u8]) -> ProcessResult<DepositData> {
    if data.is_empty() {
        return Err(invalid(index, "empty deposit data".into()));
    }
    let tokens: Vec<&[u8]> = data.split(|b| *b == ARG_SEPARATOR).collect();
    if tokens.len() < MIN_TOKENS_IN_DEPOSIT_DATA {
        return Err(invalid(
            index,
            format!("deposit data has {} tokens", tokens.len()),
        ));
    }

    // tokens[0] is the empty prefix before the first separator
    let nonce = be_bytes_to_u64(tokens[1])
        .ok_or_else(|| invalid(index, format!("nonce has {} bytes", tokens[1].len())))?;
    let gas_limit = be_bytes_to_u64(tokens[2])
        .ok_or_else(|| invalid(index, format!("gas limit has {} bytes", tokens[2].len())))?;
    Ok(DepositData {
        nonce,
        gas_limit,
        call: tokens[3..].join(&ARG_SEPARATOR),
    })
}

/// `MultiESDTNFTTransfer@count(@token@nonce@value)*@call`
fn transfer_call_data(transfer_topics: &[Vec<u8>], call: &[u8]) -> Vec<u8> {
    let count = transfer_topics.len() / TOPICS_PER_TRANSFER;

    let mut data = MULTI_ESDT_NFT_TRANSFER.as_bytes().to_vec();
    data.push(ARG_SEPARATOR);
    data.extend_from_slice(hex::encode(u128_to_min_be_bytes(count as u128)).as_bytes());

    for transfer in transfer_topics.chunks(TOPICS_PER_TRANSFER) {
        for part in transfer {
            data.push(ARG_SEPARATOR);
            data.extend_from_slice(hex::encode(part).as_bytes());
        }
    }

    data.push(ARG_SEPARATOR);
    data.extend_from_slice(call);
    data
}

fn invalid(index: usize, reason: String) -> ProcessError {
    ProcessError::InvalidEvent { index, reason }
}
