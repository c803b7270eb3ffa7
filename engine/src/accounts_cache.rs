//! Read-through account cache.
//!
//! `CacheableAccounts` wraps any [`AccountsAdapter`] and keeps every loaded
//! or saved account in memory until `commit`, which flushes the saved ones.
//! Contract accounts (accounts with code) are also written through to the
//! inner adapter on save so VM lookups by address see them immediately.
//!
//! Snapshots index the cache's own journal. Reverting restores the cached
//! values and reverts the inner adapter for write-throughs recorded after
//! the snapshot.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use causeway_hostapi::{AccountsAdapter, HostError};
use causeway_primitives::types::short_hex;
use causeway_primitives::{Address, ChainError, Hash, UserAccount};
use parking_lot::RwLock;
use tracing::debug;

enum JournalEntry {
    /// Cached value of `address` before a save; `None` if it was not cached.
    Cached {
        address: Address,
        previous: Option<UserAccount>,
    },
    /// Inner journal length before a write-through.
    WriteThrough(usize),
}

#[derive(Default)]
struct CacheState {
    accounts: HashMap<Address, UserAccount>,
    journal: Vec<JournalEntry>,
}

/// Account cache over an inner adapter.
pub struct CacheableAccounts {
    inner: Arc<dyn AccountsAdapter>,
    state: RwLock<CacheState>,
}

impl CacheableAccounts {
    pub fn new(inner: Arc<dyn AccountsAdapter>) -> Self {
        Self {
            inner,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Number of cached accounts.
    pub fn cached_len(&self) -> usize {
        self.state.read().accounts.len()
    }

    fn cached(&self, address: &Address) -> Option<UserAccount> {
        self.state.read().accounts.get(address).cloned()
    }

    /// Cache a value read from the inner adapter, unless a save raced ahead.
    fn remember(&self, account: &UserAccount) {
        self.state
            .write()
            .accounts
            .entry(account.address)
            .or_insert_with(|| account.clone());
    }
}

impl AccountsAdapter for CacheableAccounts {
    fn load_account(&self, address: &Address) -> Result<UserAccount, HostError> {
        if let Some(account) = self.cached(address) {
            return Ok(account);
        }
        let account = self.inner.load_account(address)?;
        self.remember(&account);
        Ok(account)
    }

    fn get_existing_account(&self, address: &Address) -> Result<Option<UserAccount>, HostError> {
        if let Some(account) = self.cached(address) {
            return Ok(Some(account));
        }
        let account = self.inner.get_existing_account(address)?;
        if let Some(account) = &account {
            self.remember(account);
        }
        Ok(account)
    }

    fn save_account(&self, account: UserAccount) -> Result<(), HostError> {
        let mut state = self.state.write();
        if account.is_contract() {
            let marker = self.inner.journal_len();
            self.inner.save_account(account.clone())?;
            state.journal.push(JournalEntry::WriteThrough(marker));
        }

        let address = account.address;
        let previous = state.accounts.insert(address, account);
        state.journal.push(JournalEntry::Cached { address, previous });
        Ok(())
    }

    fn journal_len(&self) -> usize {
        self.state.read().journal.len()
    }

    fn revert_to_snapshot(&self, snapshot: usize) -> Result<(), HostError> {
        let mut state = self.state.write();
        let journal_len = state.journal.len();
        if snapshot > journal_len {
            return Err(ChainError::InvalidSnapshot {
                snapshot,
                journal_len,
            }
            .into());
        }

        let undone: Vec<JournalEntry> = state.journal.drain(snapshot..).collect();
        for entry in undone.into_iter().rev() {
            match entry {
                JournalEntry::Cached { address, previous } => match previous {
                    Some(account) => {
                        state.accounts.insert(address, account);
                    }
                    None => {
                        state.accounts.remove(&address);
                    }
                },
                JournalEntry::WriteThrough(marker) => self.inner.revert_to_snapshot(marker)?,
            }
        }
        Ok(())
    }

    fn commit(&self) -> Result<Hash, HostError> {
        let mut state = self.state.write();
        let saved: BTreeSet<Address> = state
            .journal
            .iter()
            .filter_map(|entry| match entry {
                JournalEntry::Cached { address, .. } => Some(*address),
                JournalEntry::WriteThrough(_) => None,
            })
            .collect();
        for address in &saved {
            if let Some(account) = state.accounts.get(address) {
                self.inner.save_account(account.clone())?;
            }
        }
        debug!(target: "accounts_cache", flushed = saved.len(), "flushing saved accounts");

        state.accounts.clear();
        state.journal.clear();
        let root = self.inner.commit()?;
        debug!(target: "accounts_cache", root = %short_hex(&root), "committed");
        Ok(root)
    }

    /// Root of the inner adapter; cached saves are included only after `commit`.
    fn root_hash(&self) -> Hash {
        self.inner.root_hash()
    }
}
