//! Account state abstraction.
//!
//! `AccountsAdapter` is the journaled account store the execution pipeline
//! mutates. The journal length is the snapshot marker: reverting to a
//! marker undoes every save recorded after it.
//!
//! Implementations:
//! - `MemAccounts` (this crate), in-memory over a `JournaledState`
//! - `CacheableAccounts` (engine), a read-through cache over any adapter

use causeway_primitives::{Address, Hash, UserAccount};

use crate::error::HostError;

/// Journaled account storage.
///
/// Methods take `&self`; implementations guard their state internally.
/// Account mutation is still single-threaded per block.
pub trait AccountsAdapter: Send + Sync {
    /// Load an account, creating an empty one if it does not exist.
    fn load_account(&self, address: &Address) -> Result<UserAccount, HostError>;

    /// Load an account only if it exists.
    fn get_existing_account(&self, address: &Address) -> Result<Option<UserAccount>, HostError>;

    /// Store an account, journaling the value it replaces.
    fn save_account(&self, account: UserAccount) -> Result<(), HostError>;

    /// Current snapshot marker.
    fn journal_len(&self) -> usize;

    /// Undo every save recorded after `snapshot`.
    fn revert_to_snapshot(&self, snapshot: usize) -> Result<(), HostError>;

    /// Make every journaled save permanent and return the state root.
    fn commit(&self) -> Result<Hash, HostError>;

    /// State root of the current (possibly uncommitted) accounts.
    fn root_hash(&self) -> Hash;
}
