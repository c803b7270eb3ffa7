//! Transaction shapes handled by the bridge.
//!
//! Handlers never downcast: every site that accepts "some transaction"
//! takes a [`TxVariant`] and matches it exhaustively.

use crate::error::{ChainError, ChainResult};
use crate::types::{Address, Hash};

/// How a contract call was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CallType {
    #[default]
    DirectCall = 0,
    AsynchronousCall = 1,
    AsynchronousCallBack = 2,
    EsdtTransferAndExecute = 3,
}

impl CallType {
    /// Convert from the byte stored in canonical encodings.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::DirectCall),
            1 => Some(Self::AsynchronousCall),
            2 => Some(Self::AsynchronousCallBack),
            3 => Some(Self::EsdtTransferAndExecute),
            _ => None,
        }
    }
}

/// A user-signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transaction {
    pub nonce: u64,
    pub value: u128,
    pub receiver: Address,
    pub sender: Address,
    pub gas_price: u64,
    pub gas_limit: u64,
    pub data: Vec<u8>,
    pub signature: Vec<u8>,
}

/// A system-generated transaction carrying the outcome of a contract call
/// or of a bridged event (SCR).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultTransaction {
    pub nonce: u64,
    pub value: u128,
    pub receiver: Address,
    pub sender: Address,
    pub data: Vec<u8>,
    pub prev_tx_hash: Option<Hash>,
    pub original_tx_hash: Option<Hash>,
    pub gas_limit: u64,
    pub gas_price: u64,
    pub call_type: CallType,
    pub original_sender: Option<Address>,
    pub return_message: Vec<u8>,
}

impl ResultTransaction {
    /// Approximate in-memory footprint, used as the pool size hint.
    pub fn size(&self) -> usize {
        // fixed fields: nonce, value, two addresses, gas limit/price, call type
        8 + 16 + 32 + 32 + 8 + 8 + 1
            + self.data.len()
            + self.return_message.len()
            + self.prev_tx_hash.map_or(0, |_| 32)
            + self.original_tx_hash.map_or(0, |_| 32)
            + self.original_sender.map_or(0, |_| 32)
    }
}

/// Protocol reward paid to a validator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RewardTransaction {
    pub round: u64,
    pub epoch: u32,
    pub value: u128,
    pub receiver: Address,
}

/// Receipt attached to a processed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Receipt {
    pub value: u128,
    pub sender: Address,
    pub data: Vec<u8>,
    pub tx_hash: Hash,
}

/// Closed set of transaction shapes a pool may hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxVariant {
    Plain(Transaction),
    Result(ResultTransaction),
    Reward(RewardTransaction),
    Receipt(Receipt),
}

impl TxVariant {
    /// Human-readable name of the variant, used in errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Plain(_) => "transaction",
            Self::Result(_) => "smart contract result",
            Self::Reward(_) => "reward transaction",
            Self::Receipt(_) => "receipt",
        }
    }

    /// Borrow the inner SCR, failing for every other shape.
    pub fn as_result(&self) -> ChainResult<&ResultTransaction> {
        match self {
            Self::Result(scr) => Ok(scr),
            other => Err(unsupported("smart contract result", other)),
        }
    }

    /// Borrow the inner plain transaction.
    pub fn as_plain(&self) -> ChainResult<&Transaction> {
        match self {
            Self::Plain(tx) => Ok(tx),
            other => Err(unsupported("transaction", other)),
        }
    }

    /// Borrow the inner reward transaction.
    pub fn as_reward(&self) -> ChainResult<&RewardTransaction> {
        match self {
            Self::Reward(tx) => Ok(tx),
            other => Err(unsupported("reward transaction", other)),
        }
    }

    /// Borrow the inner receipt.
    pub fn as_receipt(&self) -> ChainResult<&Receipt> {
        match self {
            Self::Receipt(r) => Ok(r),
            other => Err(unsupported("receipt", other)),
        }
    }

    /// Receiver address, for shapes that have one.
    pub fn receiver(&self) -> Option<&Address> {
        match self {
            Self::Plain(tx) => Some(&tx.receiver),
            Self::Result(scr) => Some(&scr.receiver),
            Self::Reward(tx) => Some(&tx.receiver),
            Self::Receipt(_) => None,
        }
    }
}

fn unsupported(expected: &'static str, got: &TxVariant) -> ChainError {
    ChainError::UnsupportedVariant {
        expected,
        got: got.kind(),
    }
}
