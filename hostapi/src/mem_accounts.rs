//! In-memory accounts adapter for testing and in-process wiring.

use std::sync::Arc;

use causeway_primitives::{Address, Blake3Hasher, Hash, Hasher, JournaledState, UserAccount};
use parking_lot::Mutex;

use crate::accounts::AccountsAdapter;
use crate::error::HostError;

/// `AccountsAdapter` over a `JournaledState` behind a mutex.
pub struct MemAccounts {
    state: Mutex<JournaledState>,
    hasher: Arc<dyn Hasher>,
}

impl MemAccounts {
    /// Create an empty store hashing with BLAKE3.
    pub fn new() -> Self {
        Self::with_hasher(Arc::new(Blake3Hasher))
    }

    /// Create an empty store with an explicit hasher.
    pub fn with_hasher(hasher: Arc<dyn Hasher>) -> Self {
        Self {
            state: Mutex::new(JournaledState::new()),
            hasher,
        }
    }

    /// Create a store pre-populated with committed accounts.
    pub fn with_accounts(accounts: impl IntoIterator<Item = UserAccount>) -> Self {
        let mut state = JournaledState::new();
        for account in accounts {
            state.save(account);
        }
        let hasher: Arc<dyn Hasher> = Arc::new(Blake3Hasher);
        state.commit(hasher.as_ref());
        Self {
            state: Mutex::new(state),
            hasher,
        }
    }

    /// Number of stored accounts.
    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    /// Returns true if no account exists.
    pub fn is_empty(&self) -> bool {
        self.state.lock().is_empty()
    }
}

impl Default for MemAccounts {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountsAdapter for MemAccounts {
    fn load_account(&self, address: &Address) -> Result<UserAccount, HostError> {
        let state = self.state.lock();
        Ok(state
            .get(address)
            .cloned()
            .unwrap_or_else(|| UserAccount::new(*address)))
    }

    fn get_existing_account(&self, address: &Address) -> Result<Option<UserAccount>, HostError> {
        Ok(self.state.lock().get(address).cloned())
    }

    fn save_account(&self, account: UserAccount) -> Result<(), HostError> {
        self.state.lock().save(account);
        Ok(())
    }

    fn journal_len(&self) -> usize {
        self.state.lock().journal_len()
    }

    fn revert_to_snapshot(&self, snapshot: usize) -> Result<(), HostError> {
        self.state.lock().revert_to_snapshot(snapshot)?;
        Ok(())
    }

    fn commit(&self) -> Result<Hash, HostError> {
        Ok(self.state.lock().commit(self.hasher.as_ref()))
    }

    fn root_hash(&self) -> Hash {
        self.state.lock().root_hash(self.hasher.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(b: u8, balance: u128) -> UserAccount {
        UserAccount {
            address: [b; 32],
            balance,
            ..Default::default()
        }
    }

    #[test]
    fn test_load_creates_empty_account() {
        let accounts = MemAccounts::new();
        let acc = accounts.load_account(&[1; 32]).unwrap();
        assert_eq!(acc.address, [1; 32]);
        assert_eq!(acc.balance, 0);
        // loading does not store
        assert!(accounts.get_existing_account(&[1; 32]).unwrap().is_none());
        assert!(accounts.is_empty());
    }

    #[test]
    fn test_snapshot_and_revert() {
        let accounts = MemAccounts::with_accounts([account(1, 10)]);
        assert_eq!(accounts.journal_len(), 0);

        let snapshot = accounts.journal_len();
        accounts.save_account(account(1, 50)).unwrap();
        accounts.save_account(account(2, 7)).unwrap();
        assert_eq!(accounts.len(), 2);

        accounts.revert_to_snapshot(snapshot).unwrap();
        assert_eq!(accounts.load_account(&[1; 32]).unwrap().balance, 10);
        assert!(accounts.get_existing_account(&[2; 32]).unwrap().is_none());
    }

    #[test]
    fn test_revert_past_journal_fails() {
        let accounts = MemAccounts::new();
        let err = accounts.revert_to_snapshot(3).unwrap_err();
        assert!(matches!(err, HostError::Chain(_)));
    }

    #[test]
    fn test_commit_changes_root() {
        let accounts = MemAccounts::new();
        let empty_root = accounts.root_hash();
        accounts.save_account(account(1, 1)).unwrap();
        let root = accounts.commit().unwrap();
        assert_ne!(root, empty_root);
        assert_eq!(root, accounts.root_hash());
        assert_eq!(accounts.journal_len(), 0);
    }
}
