//! `causeway-engine`: sovereign-chain bridging and validation engine.
//!
//! Takes main-chain headers and their cross-chain events, turns them into
//! extended headers and incoming result transactions, tracks candidate
//! chains against notarized headers, and executes incoming results at
//! block level.
//!
//! ## Architecture
//!
//! - [`interceptor::HdrInterceptorProcessor`]: admits intercepted headers into the headers pool
//! - [`incoming::IncomingHeaderProcessor`]: events → extended header + pool insertions
//! - [`track::ChainTracker`]: tracked headers, lag and whitelist windows, longest chain
//! - [`smart_contract::SovereignScProcessor`]: executes result transactions with rollback
//! - [`preprocess::IncomingScrPreprocessor`]: mini-block and block level execution
//! - [`accounts_cache::CacheableAccounts`]: account cache over any accounts adapter
//! - [`sync_progress`]: sync statistics, progress reporting, cancellation gate
//!
//! Every collaborator is a `causeway-hostapi` trait object passed to the
//! constructors; nothing in this crate holds global state besides the
//! `tracing` subscriber installed by [`logging::init`].

pub mod config;
pub mod error;
pub mod logging;
pub mod interceptor;
pub mod incoming;
pub mod track;
pub mod smart_contract;
pub mod preprocess;
pub mod accounts_cache;
pub mod sync_progress;

// Re-export key types for convenience
pub use accounts_cache::CacheableAccounts;
pub use config::{ConfigError, EngineConfig};
pub use error::{ProcessError, ProcessResult};
pub use incoming::IncomingHeaderProcessor;
pub use interceptor::{HdrInterceptorProcessor, InterceptedData, InterceptedHeader};
pub use preprocess::{IncomingScrPreprocessor, MiniBlockProcessingOutcome, ScrPreprocessorArgs};
pub use smart_contract::{ScProcessorProxy, SmartContractProcessor, SovereignScProcessor};
pub use sync_progress::{SyncGate, SyncProgressReporter, SyncStatistics};
pub use track::ChainTracker;
