//! Result execution pipeline.
//!
//! - `processor`: the sovereign result processor (built-in calls, the
//!   post-transfer contract call, rollback on failure)
//! - `proxy`: switches between processor versions on epoch change
//! - `args_parser`, `esdt_parser`, `tx_type`: call data helpers

pub mod args_parser;
pub mod esdt_parser;
pub mod processor;
pub mod proxy;
pub mod tx_type;

use causeway_primitives::{Hash, ResultTransaction, ReturnCode, UserAccount};

use crate::error::ProcessResult;

pub use processor::{ScProcessorArgs, SovereignScProcessor};
pub use proxy::{ProcessorVersion, ScProcessorProxy};
pub use tx_type::{TransactionType, TxTypeHandler};

/// Executes result transactions against the account state.
pub trait SmartContractProcessor: Send + Sync {
    /// Execute an incoming result transaction.
    ///
    /// Transactional failures are not errors: the state is reverted and
    /// the failing return code is returned. `Err` means the transaction
    /// could not be processed at all.
    fn process_smart_contract_result(
        &self,
        scr: Option<&ResultTransaction>,
    ) -> ProcessResult<ReturnCode>;

    /// Execute a built-in function call carried by `tx`.
    fn execute_built_in_function(
        &self,
        tx: &ResultTransaction,
        sender: Option<&UserAccount>,
        receiver: &UserAccount,
    ) -> ProcessResult<ReturnCode>;

    /// Revert to `snapshot` and record a failed outcome for `tx_hash`.
    fn process_if_error(
        &self,
        tx_hash: &Hash,
        tx: &ResultTransaction,
        return_code: ReturnCode,
        message: &str,
        snapshot: usize,
    ) -> ProcessResult<()>;
}
