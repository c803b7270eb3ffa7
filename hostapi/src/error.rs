//! Collaborator error type.
//!
//! `HostError` is returned by every trait in this crate. VM-level failures
//! carry a [`ReturnCode`]; everything else is a pool, lookup or internal
//! failure with a descriptive message.

use causeway_primitives::{ChainError, ReturnCode};

/// Error returned by host collaborators (pools, VM capabilities, state).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// A VM or built-in function reported a non-OK return code.
    #[error("host error: {0}")]
    Code(ReturnCode),

    /// No virtual machine is registered for the address.
    #[error("vm not found for address {0}")]
    VmNotFound(String),

    /// A keyed lookup found nothing.
    #[error("{0} not found")]
    NotFound(String),

    /// A pool rejected an insertion or update.
    #[error("pool error: {0}")]
    Pool(String),

    /// Primitive data handling failed.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// An internal failure not mapped to a VM return code.
    #[error("internal host error: {0}")]
    Internal(String),
}

impl HostError {
    /// VM return code reported to the caller for this error.
    pub fn to_return_code(&self) -> ReturnCode {
        match self {
            Self::Code(code) => *code,
            Self::VmNotFound(_) => ReturnCode::ContractNotFound,
            _ => ReturnCode::ExecutionFailed,
        }
    }

    /// Create a user-error code.
    pub fn user_error() -> Self {
        Self::Code(ReturnCode::UserError)
    }

    /// Create an out-of-funds code.
    pub fn out_of_funds() -> Self {
        Self::Code(ReturnCode::OutOfFunds)
    }

    /// Create a function-not-found code.
    pub fn function_not_found() -> Self {
        Self::Code(ReturnCode::FunctionNotFound)
    }

    /// Create a missing-VM error for a hex-encoded address.
    pub fn vm_not_found(address: impl Into<String>) -> Self {
        Self::VmNotFound(address.into())
    }

    /// Create a lookup error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a pool error.
    pub fn pool(msg: impl Into<String>) -> Self {
        Self::Pool(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<ReturnCode> for HostError {
    fn from(code: ReturnCode) -> Self {
        Self::Code(code)
    }
}
