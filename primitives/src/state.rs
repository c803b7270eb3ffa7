//! Journaled account state.
//!
//! Every account write is recorded in a journal together with the value it
//! replaced. The journal length is the snapshot marker: reverting to a
//! marker undoes, newest first, every write recorded after it. Committing
//! drops the journal, making the current values permanent.

use std::collections::BTreeMap;

use crate::codec::CanonicalEncode;
use crate::crypto::Hasher;
use crate::error::{ChainError, ChainResult};
use crate::types::{Address, Hash};

/// A user (or contract) account.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserAccount {
    pub address: Address,
    pub nonce: u64,
    pub balance: u128,
    pub code: Vec<u8>,
    pub storage: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl UserAccount {
    /// Fresh, empty account at `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    /// Returns true if the account holds contract code.
    pub fn is_contract(&self) -> bool {
        !self.code.is_empty()
    }

    /// Apply a signed balance change, failing on underflow or overflow.
    pub fn apply_balance_delta(&mut self, delta: i128) -> Option<()> {
        let magnitude = delta.unsigned_abs();
        self.balance = if delta >= 0 {
            self.balance.checked_add(magnitude)?
        } else {
            self.balance.checked_sub(magnitude)?
        };
        Some(())
    }
}

/// A recorded write: the account value before it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct JournalEntry {
    address: Address,
    previous: Option<UserAccount>,
}

/// Account map with write journal.
///
/// `BTreeMap` keeps iteration (and therefore the root hash) in address order.
#[derive(Debug, Clone, Default)]
pub struct JournaledState {
    accounts: BTreeMap<Address, UserAccount>,
    journal: Vec<JournalEntry>,
}

impl JournaledState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an account.
    pub fn get(&self, address: &Address) -> Option<&UserAccount> {
        self.accounts.get(address)
    }

    /// Store an account, journaling the value it replaces.
    pub fn save(&mut self, account: UserAccount) {
        let previous = self.accounts.insert(account.address, account.clone());
        self.journal.push(JournalEntry {
            address: account.address,
            previous,
        });
    }

    /// Current snapshot marker.
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    /// Undo every write recorded after `snapshot`.
    pub fn revert_to_snapshot(&mut self, snapshot: usize) -> ChainResult<()> {
        if snapshot > self.journal.len() {
            return Err(ChainError::InvalidSnapshot {
                snapshot,
                journal_len: self.journal.len(),
            });
        }
        while self.journal.len() > snapshot {
            let Some(entry) = self.journal.pop() else {
                break;
            };
            match entry.previous {
                Some(prev) => {
                    self.accounts.insert(entry.address, prev);
                }
                None => {
                    self.accounts.remove(&entry.address);
                }
            }
        }
        Ok(())
    }

    /// Make all journaled writes permanent and return the new root hash.
    pub fn commit(&mut self, hasher: &dyn Hasher) -> Hash {
        self.journal.clear();
        self.root_hash(hasher)
    }

    /// Hash over the canonical encoding of every account, in address order.
    pub fn root_hash(&self, hasher: &dyn Hasher) -> Hash {
        let mut buf = Vec::with_capacity(self.accounts.len() * 96);
        for account in self.accounts.values() {
            account.encode_to(&mut buf);
        }
        hasher.compute(&buf)
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns true if no account exists.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
