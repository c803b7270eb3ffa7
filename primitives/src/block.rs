//! Header, mini-block and cross-chain event types.
//!
//! A main-chain header arrives together with its events as an
//! [`IncomingHeader`]. The bridge turns it into an [`ExtendedHeader`]:
//! the original header plus the incoming mini-blocks derived from the
//! events. Both shapes travel through pools as a [`HeaderVariant`].

use crate::types::{Address, Epoch, Hash, Nonce, Round, ShardId, SOVEREIGN_CHAIN_SHARD_ID};

/// Kind of transactions grouped in a mini-block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum MiniBlockType {
    #[default]
    TxBlock = 0,
    SmartContractResultBlock = 1,
    RewardsBlock = 2,
    ReceiptBlock = 3,
    PeerBlock = 4,
    InvalidBlock = 5,
}

impl MiniBlockType {
    /// Convert from the byte stored in canonical encodings.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::TxBlock),
            1 => Some(Self::SmartContractResultBlock),
            2 => Some(Self::RewardsBlock),
            3 => Some(Self::ReceiptBlock),
            4 => Some(Self::PeerBlock),
            5 => Some(Self::InvalidBlock),
            _ => None,
        }
    }
}

/// Ordered group of transaction hashes sharing sender/receiver routing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MiniBlock {
    pub tx_hashes: Vec<Hash>,
    pub sender_shard_id: ShardId,
    pub receiver_shard_id: ShardId,
    pub kind: MiniBlockType,
}

/// Summary of a mini-block as committed in a header, including how far
/// the proposer executed it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MiniBlockHeader {
    pub hash: Hash,
    pub sender_shard_id: ShardId,
    pub receiver_shard_id: ShardId,
    pub tx_count: u32,
    pub kind: MiniBlockType,
    pub index_of_first_tx_processed: i32,
    pub index_of_last_tx_processed: i32,
}

/// Where execution of a mini-block resumes, and where the proposer stopped.
///
/// Indexes are `-1` when nothing was processed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiniBlockExecutionCursor {
    pub index_of_last_tx_processed: i32,
    pub index_of_last_tx_processed_by_proposer: i32,
}

/// Standard block header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    pub shard_id: ShardId,
    pub nonce: Nonce,
    pub round: Round,
    pub epoch: Epoch,
    pub timestamp: u64,
    pub prev_hash: Hash,
    pub prev_rand_seed: Vec<u8>,
    pub rand_seed: Vec<u8>,
    pub root_hash: Hash,
    pub mini_block_headers: Vec<MiniBlockHeader>,
}

impl Header {
    /// Find the committed summary of a mini-block by its hash.
    pub fn mini_block_header(&self, mb_hash: &Hash) -> Option<&MiniBlockHeader> {
        self.mini_block_headers.iter().find(|mbh| &mbh.hash == mb_hash)
    }
}

/// Block body: the mini-blocks referenced by a header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Body {
    pub mini_blocks: Vec<MiniBlock>,
}

/// Opaque cross-chain event emitted on the main chain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IncomingEvent {
    pub identifier: Vec<u8>,
    pub address: Address,
    pub topics: Vec<Vec<u8>>,
    pub data: Vec<u8>,
}

/// A bridge operation whose execution the main chain confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BridgeOperation {
    pub hash_of_hashes: Vec<u8>,
    pub hash: Vec<u8>,
}

/// Main-chain header as delivered by the notifier, with its events.
///
/// The inner header may be missing when the notifier could not decode it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IncomingHeader {
    pub header: Option<Header>,
    pub events: Vec<IncomingEvent>,
}

/// Local header enriched with incoming mini-blocks derived from main-chain events.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtendedHeader {
    pub header: Header,
    pub incoming_mini_blocks: Vec<MiniBlock>,
    pub incoming_events: Vec<IncomingEvent>,
    pub confirmed_bridge_operations: Vec<BridgeOperation>,
}

impl ExtendedHeader {
    /// Every transaction hash referenced by the incoming mini-blocks, in order.
    pub fn incoming_tx_hashes(&self) -> Vec<Hash> {
        self.incoming_mini_blocks
            .iter()
            .flat_map(|mb| mb.tx_hashes.iter().copied())
            .collect()
    }
}

/// Closed set of header shapes stored in the headers pool and tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderVariant {
    Plain(Header),
    Extended(ExtendedHeader),
}

impl HeaderVariant {
    /// The standard header, for either shape.
    pub fn header(&self) -> &Header {
        match self {
            Self::Plain(h) => h,
            Self::Extended(ext) => &ext.header,
        }
    }

    pub fn nonce(&self) -> Nonce {
        self.header().nonce
    }

    pub fn round(&self) -> Round {
        self.header().round
    }

    pub fn prev_hash(&self) -> &Hash {
        &self.header().prev_hash
    }

    pub fn prev_rand_seed(&self) -> &[u8] {
        &self.header().prev_rand_seed
    }

    pub fn rand_seed(&self) -> &[u8] {
        &self.header().rand_seed
    }

    /// Shard bucket the header is tracked under: extended headers always
    /// belong to the sovereign chain, plain ones to their declared shard.
    pub fn tracking_shard(&self) -> ShardId {
        match self {
            Self::Plain(h) => h.shard_id,
            Self::Extended(_) => SOVEREIGN_CHAIN_SHARD_ID,
        }
    }

    pub fn as_extended(&self) -> Option<&ExtendedHeader> {
        match self {
            Self::Extended(ext) => Some(ext),
            Self::Plain(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Plain(_) => "header",
            Self::Extended(_) => "extended header",
        }
    }
}
