//! Transaction type detection.

use std::collections::BTreeSet;

use causeway_primitives::{Address, ResultTransaction};

use super::args_parser::parse_call_data;
use super::esdt_parser::{
    BUILT_IN_ESDT_NFT_TRANSFER, BUILT_IN_ESDT_TRANSFER, BUILT_IN_MULTI_ESDT_NFT_TRANSFER,
};

/// Number of leading zero bytes that mark a smart contract address.
const SC_ADDRESS_ZERO_PREFIX: usize = 8;

/// What a transaction does once it reaches its receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    MoveBalance,
    SCInvoking,
    BuiltInFunctionCall,
}

/// Returns true if `address` belongs to a smart contract.
pub fn is_smart_contract_address(address: &Address) -> bool {
    address[..SC_ADDRESS_ZERO_PREFIX].iter().all(|b| *b == 0)
}

/// Classifies result transactions by their call data and receiver.
#[derive(Debug, Clone)]
pub struct TxTypeHandler {
    built_in_functions: BTreeSet<String>,
}

impl TxTypeHandler {
    /// Handler knowing the given built-in function names.
    pub fn new(built_in_functions: impl IntoIterator<Item = String>) -> Self {
        Self {
            built_in_functions: built_in_functions.into_iter().collect(),
        }
    }

    pub fn is_built_in_function(&self, function: &str) -> bool {
        self.built_in_functions.contains(function)
    }

    pub fn compute_transaction_type(&self, tx: &ResultTransaction) -> TransactionType {
        if tx.data.is_empty() {
            return TransactionType::MoveBalance;
        }
        let Ok((function, _)) = parse_call_data(&tx.data) else {
            return TransactionType::MoveBalance;
        };
        if self.is_built_in_function(&function) {
            return TransactionType::BuiltInFunctionCall;
        }
        if is_smart_contract_address(&tx.receiver) {
            return TransactionType::SCInvoking;
        }
        TransactionType::MoveBalance
    }
}

impl Default for TxTypeHandler {
    /// Handler knowing the token transfer built-ins.
    fn default() -> Self {
        Self::new(
            [
                BUILT_IN_ESDT_TRANSFER,
                BUILT_IN_ESDT_NFT_TRANSFER,
                BUILT_IN_MULTI_ESDT_NFT_TRANSFER,
            ]
            .map(String::from),
        )
    }
}
