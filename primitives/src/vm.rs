//! Virtual-machine boundary types: call input, structured output, logs.
//!
//! The VM itself is an external capability. These types are what the
//! result execution pipeline hands to it and gets back.

use std::collections::BTreeMap;

use crate::error::ReturnCode;
use crate::transaction::CallType;
use crate::types::{Address, Hash};

/// Identifier of the log entry written when a transaction fails.
pub const SIGNAL_ERROR_IDENTIFIER: &[u8] = b"signalError";

/// One fungible or semi-fungible token movement inside a call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EsdtTransfer {
    pub token_identifier: Vec<u8>,
    pub token_nonce: u64,
    pub value: u128,
}

/// Input for a contract call or built-in function.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContractCallInput {
    pub caller: Address,
    pub recipient: Address,
    pub function: String,
    pub arguments: Vec<Vec<u8>>,
    pub call_value: u128,
    pub call_type: CallType,
    pub gas_provided: u64,
    pub gas_locked: u64,
    pub current_tx_hash: Hash,
    pub original_tx_hash: Hash,
    pub esdt_transfers: Vec<EsdtTransfer>,
    pub return_call_after_error: bool,
}

/// A transfer the VM asks the protocol to perform on its behalf.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputTransfer {
    pub value: u128,
    pub data: Vec<u8>,
    pub gas_limit: u64,
    pub call_type: CallType,
    pub sender: Option<Address>,
}

/// Per-account effect of a VM call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputAccount {
    pub address: Address,
    pub balance_delta: i128,
    pub nonce: Option<u64>,
    pub storage_updates: BTreeMap<Vec<u8>, Vec<u8>>,
    pub output_transfers: Vec<OutputTransfer>,
}

/// A log entry emitted during execution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogEntry {
    pub identifier: Vec<u8>,
    pub address: Address,
    pub topics: Vec<Vec<u8>>,
    pub data: Vec<u8>,
}

/// Structured result of a VM call.
///
/// Output accounts are keyed by address in a `BTreeMap`, so iterating
/// them yields the sorted order every node agrees on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VmOutput {
    pub return_code: ReturnCode,
    pub return_message: String,
    pub return_data: Vec<Vec<u8>>,
    pub gas_remaining: u64,
    pub gas_refund: u128,
    pub output_accounts: BTreeMap<Address, OutputAccount>,
    pub logs: Vec<LogEntry>,
}

impl VmOutput {
    /// Output reporting `code` with no effects.
    pub fn with_code(code: ReturnCode, message: impl Into<String>) -> Self {
        Self {
            return_code: code,
            return_message: message.into(),
            ..Default::default()
        }
    }
}

/// Token transfers recognised in the call data of a transfer built-in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedEsdtTransfers {
    pub esdt_transfers: Vec<EsdtTransfer>,
    pub receiver: Address,
    pub call_function: String,
    pub call_args: Vec<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_code() {
        let out = VmOutput::with_code(ReturnCode::UserError, "boom");
        assert_eq!(out.return_code, ReturnCode::UserError);
        assert_eq!(out.return_message, "boom");
        assert!(out.output_accounts.is_empty());
        assert_eq!(out.gas_remaining, 0);
    }

    #[test]
    fn test_output_accounts_iterate_sorted() {
        let mut out = VmOutput::default();
        for b in [9u8, 1, 5] {
            out.output_accounts.insert(
                [b; 32],
                OutputAccount {
                    address: [b; 32],
                    ..Default::default()
                },
            );
        }
        let order: Vec<u8> = out.output_accounts.keys().map(|k| k[0]).collect();
        assert_eq!(order, vec![1, 5, 9]);
    }
}
