//! Time-bounded key cache used as the header blacklist.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use causeway_primitives::Hash;
use parking_lot::RwLock;

use crate::traits::BlacklistCache;

/// Keys that expire after their span; expired keys are only evicted by `sweep`.
#[derive(Default)]
pub struct TimeCache {
    entries: RwLock<HashMap<Hash, Instant>>,
}

impl TimeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlacklistCache for TimeCache {
    fn sweep(&self) {
        let now = Instant::now();
        self.entries.write().retain(|_, expires| *expires > now);
    }

    fn has(&self, key: &Hash) -> bool {
        self.entries.read().contains_key(key)
    }

    fn upsert(&self, key: Hash, span: Duration) {
        let expires = Instant::now() + span;
        self.entries
            .write()
            .entry(key)
            .and_modify(|e| *e = (*e).max(expires))
            .or_insert(expires);
    }
}
