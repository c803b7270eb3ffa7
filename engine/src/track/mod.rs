//! Chain tracker.
//!
//! Keeps, per shard, the headers received from the pool (tracked) and the
//! headers already notarized. Extended headers of the sovereign chain are
//! only tracked while they lie inside the lag window after the last
//! cross-notarized one, and the transactions of near headers are
//! whitelisted ahead of their interception.
//!
//! The longest extended chain is walked from the last cross-notarized
//! header: each step takes the tracked header at the next nonce whose
//! prev hash and prev rand seed point at the current frontier. When
//! several headers qualify, the lowest hash wins.

pub mod notarizer;

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use causeway_hostapi::{HeadersPool, WhitelistHandler};
use causeway_primitives::types::short_hex;
use causeway_primitives::{
    ExtendedHeader, Hash, HeaderVariant, Nonce, ShardId, SOVEREIGN_CHAIN_SHARD_ID,
};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::config::TrackerConfig;
use crate::error::ProcessResult;

pub use notarizer::{HeaderNotarizer, TrackedHeader};

/// Last self-notarized header, with the (always empty) chain built on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfChain {
    pub last_notarized: TrackedHeader,
    pub headers: Vec<HeaderVariant>,
    pub hashes: Vec<Hash>,
}

/// Linked extended headers following the last cross-notarized one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedChain {
    pub headers: Vec<HeaderVariant>,
    pub hashes: Vec<Hash>,
    /// Hash of the last header of the chain, or of the notarized start
    /// when the chain is empty.
    pub frontier_hash: Hash,
}

/// Tracks candidate headers and notarization state per shard.
pub struct ChainTracker {
    self_shard_id: ShardId,
    max_lag_window: u64,
    max_headers_to_whitelist_in_advance: u64,
    whitelist: Arc<dyn WhitelistHandler>,
    cross_notarizer: HeaderNotarizer,
    self_notarizer: HeaderNotarizer,
    tracked: RwLock<HashMap<ShardId, Vec<TrackedHeader>>>,
}

impl ChainTracker {
    pub fn new(
        self_shard_id: ShardId,
        config: &TrackerConfig,
        whitelist: Arc<dyn WhitelistHandler>,
    ) -> Self {
        Self {
            self_shard_id,
            max_lag_window: config.max_lag_window,
            max_headers_to_whitelist_in_advance: config.max_headers_to_whitelist_in_advance,
            whitelist,
            cross_notarizer: HeaderNotarizer::new(),
            self_notarizer: HeaderNotarizer::new(),
            tracked: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to the headers pool so every admitted header is tracked.
    ///
    /// The pool only holds a weak reference; dropping the tracker ends
    /// the subscription.
    pub fn register_on_pool(self: &Arc<Self>, pool: &dyn HeadersPool) {
        let tracker: Weak<Self> = Arc::downgrade(self);
        pool.register_handler(Arc::new(move |hash: &Hash, header: &HeaderVariant| {
            if let Some(tracker) = tracker.upgrade() {
                tracker.received_header(header, *hash);
            }
        }));
    }

    /// Track a header admitted to the pool. Extended headers go through
    /// the lag window and whitelisting of
    /// [`received_extended_shard_header`](Self::received_extended_shard_header);
    /// plain ones are tracked in their own shard.
    pub fn received_header(&self, header: &HeaderVariant, hash: Hash) {
        trace!(
            target: "track",
            kind = header.kind(),
            shard = header.tracking_shard(),
            nonce = header.nonce(),
            hash = %short_hex(&hash),
            "received header"
        );
        match header {
            HeaderVariant::Extended(extended) => self.received_extended_shard_header(extended, hash),
            HeaderVariant::Plain(_) => self.add_tracked_header(header.clone(), hash),
        }
    }

    /// Track an extended header if it falls inside the lag window, then
    /// whitelist its transactions when it is close enough.
    pub fn received_extended_shard_header(&self, header: &ExtendedHeader, hash: Hash) {
        if !self.should_add_extended_shard_header(header) {
            debug!(
                target: "track",
                nonce = header.header.nonce,
                hash = %short_hex(&hash),
                "extended shard header is out of range, dropped"
            );
            return;
        }

        self.add_tracked_header(HeaderVariant::Extended(header.clone()), hash);
        self.do_whitelist_with_extended_shard_header_if_needed(header);
    }

    /// Returns true if the header is beyond the lag window, or if nothing
    /// has been notarized yet.
    pub fn is_extended_shard_header_out_of_range(&self, header: &ExtendedHeader) -> bool {
        match self.last_cross_notarized_nonce() {
            Some(last) => header.header.nonce > last.saturating_add(self.max_lag_window),
            None => true,
        }
    }

    /// Returns true if the header should be tracked: always while nothing
    /// is notarized, otherwise only inside `(last, last + max_lag_window]`.
    pub fn should_add_extended_shard_header(&self, header: &ExtendedHeader) -> bool {
        let Some(last) = self.last_cross_notarized_nonce() else {
            return true;
        };
        let nonce = header.header.nonce;
        nonce > last && nonce <= last.saturating_add(self.max_lag_window)
    }

    /// Whitelist every incoming transaction of `header` when it lies
    /// within the whitelist window of the last notarized header.
    pub fn do_whitelist_with_extended_shard_header_if_needed(&self, header: &ExtendedHeader) {
        let Some(last) = self.last_cross_notarized_nonce() else {
            return;
        };
        if header.header.nonce > last.saturating_add(self.max_headers_to_whitelist_in_advance) {
            return;
        }

        let hashes = header.incoming_tx_hashes();
        if hashes.is_empty() {
            return;
        }
        trace!(
            target: "track",
            nonce = header.header.nonce,
            txs = hashes.len(),
            "whitelisting incoming transactions"
        );
        self.whitelist.add(&hashes);
    }

    /// The self chain is never extended locally: return the last
    /// self-notarized header with no successors.
    pub fn compute_longest_self_chain(&self) -> ProcessResult<SelfChain> {
        let last_notarized = self
            .self_notarizer
            .get_last_notarized_header(self.self_shard_id)?;
        Ok(SelfChain {
            last_notarized,
            headers: Vec::new(),
            hashes: Vec::new(),
        })
    }

    /// Walk the tracked sovereign headers from the last cross-notarized one.
    pub fn compute_longest_extended_shard_chain_from_last_notarized(
        &self,
    ) -> ProcessResult<ExtendedChain> {
        let start = self
            .cross_notarizer
            .get_last_notarized_header(SOVEREIGN_CHAIN_SHARD_ID)?;
        let tracked = self.get_tracked_headers(SOVEREIGN_CHAIN_SHARD_ID);

        let start_nonce = start.nonce();
        let mut headers = Vec::new();
        let mut hashes = Vec::new();
        let mut frontier = start;

        loop {
            // tracked is sorted by (nonce, hash), so the first match has the lowest hash
            let next = tracked.iter().find(|candidate| {
                candidate.nonce() == frontier.nonce().saturating_add(1)
                    && candidate.header.prev_hash() == &frontier.hash
                    && candidate.header.prev_rand_seed() == frontier.header.rand_seed()
            });
            let Some(next) = next else {
                break;
            };
            headers.push(next.header.clone());
            hashes.push(next.hash);
            frontier = next.clone();
        }

        debug!(
            target: "track",
            start_nonce,
            length = headers.len(),
            "computed longest extended shard chain"
        );
        Ok(ExtendedChain {
            headers,
            hashes,
            frontier_hash: frontier.hash,
        })
    }

    pub fn add_cross_notarized_header(&self, shard: ShardId, header: HeaderVariant, hash: Hash) {
        self.cross_notarizer.add_notarized_header(shard, header, hash);
    }

    pub fn add_self_notarized_header(&self, shard: ShardId, header: HeaderVariant, hash: Hash) {
        self.self_notarizer.add_notarized_header(shard, header, hash);
    }

    /// Track a header in its shard bucket, replacing any entry with the
    /// same hash and keeping nonce order.
    pub fn add_tracked_header(&self, header: HeaderVariant, hash: Hash) {
        let shard = header.tracking_shard();
        let mut tracked = self.tracked.write();
        notarizer::insert_sorted(
            tracked.entry(shard).or_default(),
            TrackedHeader::new(header, hash),
        );
    }

    /// Tracked headers of `shard` inside the lag window, in nonce order.
    pub fn get_tracked_headers(&self, shard: ShardId) -> Vec<TrackedHeader> {
        let last = self.cross_notarizer.last_notarized_nonce(shard);
        let tracked = self.tracked.read();
        let Some(headers) = tracked.get(&shard) else {
            return Vec::new();
        };
        headers
            .iter()
            .filter(|h| match last {
                Some(last) => {
                    h.nonce() > last && h.nonce() <= last.saturating_add(self.max_lag_window)
                }
                None => true,
            })
            .cloned()
            .collect()
    }

    pub fn get_last_cross_notarized_header(&self, shard: ShardId) -> ProcessResult<TrackedHeader> {
        self.cross_notarizer.get_last_notarized_header(shard)
    }

    pub fn get_self_notarized_header(
        &self,
        shard: ShardId,
        offset: usize,
    ) -> ProcessResult<TrackedHeader> {
        self.self_notarizer.get_notarized_header(shard, offset)
    }

    /// Forget tracked headers of `shard` with a nonce below `nonce`.
    pub fn clean_tracked_headers_behind_nonce(&self, shard: ShardId, nonce: Nonce) {
        let mut tracked = self.tracked.write();
        if let Some(headers) = tracked.get_mut(&shard) {
            headers.retain(|h| h.nonce() >= nonce);
        }
    }

    /// Number of tracked headers of `shard`, before window filtering.
    pub fn num_tracked(&self, shard: ShardId) -> usize {
        self.tracked.read().get(&shard).map_or(0, Vec::len)
    }

    fn last_cross_notarized_nonce(&self) -> Option<Nonce> {
        self.cross_notarizer
            .last_notarized_nonce(SOVEREIGN_CHAIN_SHARD_ID)
    }
}
