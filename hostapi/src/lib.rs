//! `causeway-hostapi`: collaborator traits and in-memory implementations
//! for the Causeway bridge engine.
//!
//! The engine never talks to storage, pools or a VM directly. It consumes
//! the traits defined here:
//!
//! - pools (`HeadersPool`, `TransactionPool`, `OutgoingOperationsPool`)
//! - VM capabilities (`BlockchainHook`, `VmContainer`, `VmExecutor`)
//! - handlers (whitelist, gas, blacklist, hardfork exclusion)
//! - output sinks (logs, VM output cache, intermediate results)
//! - block settings (`EconomicsFee`, `EnableEpochsHandler`, `BlockSizeComputation`)
//! - `AccountsAdapter`, the journaled account store
//! - `Storer`, key-value storage for processed block data
//!
//! Each trait has an in-memory implementation used by tests and by
//! in-process wiring.

pub mod error;
pub mod types;
pub mod traits;
pub mod accounts;
pub mod mem_accounts;
pub mod mem_pools;
pub mod mem_outputs;
pub mod time_cache;
pub mod gas_handler;
pub mod store;

// Re-export commonly used types at the crate root.
pub use error::HostError;
pub use types::{
    BlockSizeThrottle, EpochFlags, FeeSettings, OutgoingOperation, OutgoingOperationsBatch,
    RoundExclusions,
};
pub use traits::{
    BlacklistCache, BlockSizeComputation, BlockchainHook, EconomicsFee, EnableEpochsHandler,
    GasHandler, HardforkExclusionHandler, HeaderHandler, HeadersPool, IntermediateResultsForwarder,
    OutgoingOperationsPool, PreProcessorExecutionInfoHandler, TransactionPool, TxLogsProcessor,
    VmContainer, VmExecutor, VmOutputCache, WhitelistHandler,
};
pub use accounts::AccountsAdapter;
pub use mem_accounts::MemAccounts;
pub use mem_pools::{MemHeadersPool, MemOutgoingOperations, MemTxPool, MemWhitelist};
pub use mem_outputs::{ExecutionInfoCounter, MemResultsForwarder, MemTxLogs, MemVmOutputCache};
pub use time_cache::TimeCache;
pub use gas_handler::GasComputation;
pub use store::{MemStore, Storer};
