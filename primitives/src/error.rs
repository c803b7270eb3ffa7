//! Error types shared across the Causeway workspace.
//!
//! `ReturnCode` is the VM-level outcome of a contract or built-in function
//! call. `ChainError` covers canonical-encoding failures and structural
//! problems detected on primitive data.

use std::fmt;

/// Outcome code reported by a virtual machine or built-in function call.
///
/// The repr values are stable: they are part of cached VM outputs and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum ReturnCode {
    #[default]
    Ok = 0,
    FunctionNotFound = 1,
    FunctionWrongSignature = 2,
    ContractNotFound = 3,
    UserError = 4,
    OutOfGas = 5,
    AccountCollision = 6,
    OutOfFunds = 7,
    CallStackOverFlow = 8,
    ContractInvalid = 9,
    ExecutionFailed = 10,
    UpgradeFailed = 11,
    SimulateFailed = 12,
}

impl ReturnCode {
    /// Convert from the numeric representation.
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::FunctionNotFound),
            2 => Some(Self::FunctionWrongSignature),
            3 => Some(Self::ContractNotFound),
            4 => Some(Self::UserError),
            5 => Some(Self::OutOfGas),
            6 => Some(Self::AccountCollision),
            7 => Some(Self::OutOfFunds),
            8 => Some(Self::CallStackOverFlow),
            9 => Some(Self::ContractInvalid),
            10 => Some(Self::ExecutionFailed),
            11 => Some(Self::UpgradeFailed),
            12 => Some(Self::SimulateFailed),
            _ => None,
        }
    }

    /// Return the i32 representation of this code.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Returns true if this is the `Ok` variant.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::FunctionNotFound => "function not found",
            Self::FunctionWrongSignature => "wrong signature for function",
            Self::ContractNotFound => "contract not found",
            Self::UserError => "user error",
            Self::OutOfGas => "out of gas",
            Self::AccountCollision => "account collision",
            Self::OutOfFunds => "out of funds",
            Self::CallStackOverFlow => "call stack overflow",
            Self::ContractInvalid => "contract invalid",
            Self::ExecutionFailed => "execution failed",
            Self::UpgradeFailed => "upgrade failed",
            Self::SimulateFailed => "simulate failed",
        };
        f.write_str(s)
    }
}

/// Errors raised by primitive data handling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// Canonical encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A closed sum type held a variant the call site cannot handle.
    #[error("unsupported variant: expected {expected}, got {got}")]
    UnsupportedVariant {
        expected: &'static str,
        got: &'static str,
    },

    /// Mini-block processing indexes fall outside the mini-block.
    #[error(
        "index is out of bound: first to be processed {first}, last to be processed {last}, max index {max_index}"
    )]
    IndexOutOfBound { first: i32, last: i32, max_index: i32 },

    /// Call data could not be split into a function and arguments.
    #[error("invalid call data: {0}")]
    InvalidCallData(String),

    /// A revert targeted a snapshot newer than the journal.
    #[error("invalid snapshot {snapshot}: journal length is {journal_len}")]
    InvalidSnapshot { snapshot: usize, journal_len: usize },

    /// Adding a transaction would exceed the gas ceiling of its mini-block.
    #[error("max gas limit per mini block in receiver shard is reached: limit {limit}, needed {needed}")]
    MaxGasLimitPerMiniBlockInReceiverShardIsReached { limit: u64, needed: u64 },

    /// Adding a transaction would exceed the gas ceiling of the block.
    #[error("max gas limit per block in self shard is reached: limit {limit}, needed {needed}")]
    MaxGasLimitPerBlockInSelfShardIsReached { limit: u64, needed: u64 },
}

/// Convenience result type for primitive operations.
pub type ChainResult<T> = Result<T, ChainError>;
