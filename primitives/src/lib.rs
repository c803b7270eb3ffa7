//! `causeway-primitives`: foundational types for the Causeway bridge engine.
//!
//! This crate provides the data model shared by the host collaborators and
//! the engine: headers and mini-blocks, result transactions, VM call I/O,
//! error codes, canonical encoding, hashing, gas bookkeeping, the journaled
//! account state and address-to-shard routing.

pub mod types;
pub mod error;
pub mod transaction;
pub mod block;
pub mod vm;
pub mod codec;
pub mod crypto;
pub mod gas;
pub mod state;
pub mod sharding;

// Re-export commonly used types at the crate root for convenience.
pub use types::{
    Address, Epoch, Hash, Nonce, Round, ShardId, ESDT_SYSTEM_ADDRESS, MAIN_CHAIN_SHARD_ID,
    METACHAIN_SHARD_ID, SOVEREIGN_CHAIN_SHARD_ID, ZERO_ADDRESS, ZERO_HASH,
};
pub use error::{ChainError, ChainResult, ReturnCode};
pub use transaction::{CallType, Receipt, ResultTransaction, RewardTransaction, Transaction, TxVariant};
pub use block::{
    Body, BridgeOperation, ExtendedHeader, Header, HeaderVariant, IncomingEvent, IncomingHeader,
    MiniBlock, MiniBlockExecutionCursor, MiniBlockHeader, MiniBlockType,
};
pub use vm::{
    ContractCallInput, EsdtTransfer, LogEntry, OutputAccount, OutputTransfer, ParsedEsdtTransfers,
    VmOutput,
};
pub use codec::CanonicalEncode;
pub use crypto::{calculate_hash, Blake3Hasher, Hasher, Sha256Hasher};
pub use gas::GasConsumedInfo;
pub use state::{JournaledState, UserAccount};
pub use sharding::{MultiShardCoordinator, ShardCoordinator, SovereignShardCoordinator};
