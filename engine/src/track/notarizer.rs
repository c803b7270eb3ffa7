//! Per-shard record of notarized headers.

use std::collections::HashMap;

use causeway_primitives::{Hash, HeaderVariant, Nonce, ShardId};
use parking_lot::RwLock;

use crate::error::{ProcessError, ProcessResult};

/// A header together with its hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedHeader {
    pub header: HeaderVariant,
    pub hash: Hash,
}

impl TrackedHeader {
    pub fn new(header: HeaderVariant, hash: Hash) -> Self {
        Self { header, hash }
    }

    pub fn nonce(&self) -> Nonce {
        self.header.nonce()
    }
}

/// Notarized headers per shard, kept in nonce order.
#[derive(Debug, Default)]
pub struct HeaderNotarizer {
    notarized: RwLock<HashMap<ShardId, Vec<TrackedHeader>>>,
}

impl HeaderNotarizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a notarized header. A header with the same hash is replaced.
    pub fn add_notarized_header(&self, shard: ShardId, header: HeaderVariant, hash: Hash) {
        let mut notarized = self.notarized.write();
        let headers = notarized.entry(shard).or_default();
        insert_sorted(headers, TrackedHeader::new(header, hash));
    }

    /// Most recent (highest nonce) notarized header of `shard`.
    pub fn get_last_notarized_header(&self, shard: ShardId) -> ProcessResult<TrackedHeader> {
        self.notarized
            .read()
            .get(&shard)
            .and_then(|headers| headers.last().cloned())
            .ok_or(ProcessError::NilNotarizedHeaderSlice)
    }

    /// Nonce of the last notarized header, if any.
    pub fn last_notarized_nonce(&self, shard: ShardId) -> Option<Nonce> {
        self.notarized
            .read()
            .get(&shard)
            .and_then(|headers| headers.last().map(TrackedHeader::nonce))
    }

    /// Notarized header `offset` positions behind the last one.
    pub fn get_notarized_header(&self, shard: ShardId, offset: usize) -> ProcessResult<TrackedHeader> {
        let notarized = self.notarized.read();
        let headers = notarized
            .get(&shard)
            .filter(|headers| !headers.is_empty())
            .ok_or(ProcessError::NilNotarizedHeaderSlice)?;
        if offset >= headers.len() {
            return Err(ProcessError::NotarizedHeaderOffsetOutOfBound {
                offset,
                len: headers.len(),
            });
        }
        Ok(headers[headers.len() - 1 - offset].clone())
    }

    /// Drop notarized headers with a nonce below `nonce`, keeping at least
    /// the last one.
    pub fn clean_notarized_headers_behind_nonce(&self, shard: ShardId, nonce: Nonce) {
        let mut notarized = self.notarized.write();
        let Some(headers) = notarized.get_mut(&shard) else {
            return;
        };
        let Some(last) = headers.pop() else {
            return;
        };
        headers.retain(|h| h.nonce() >= nonce);
        headers.push(last);
    }

    pub fn num_notarized(&self, shard: ShardId) -> usize {
        self.notarized.read().get(&shard).map_or(0, Vec::len)
    }
}

/// Insert keeping `(nonce, hash)` order, replacing an entry with the same hash.
pub(crate) fn insert_sorted(headers: &mut Vec<TrackedHeader>, entry: TrackedHeader) {
    headers.retain(|h| h.hash != entry.hash);
    let key = (entry.nonce(), entry.hash);
    let pos = headers.partition_point(|h| (h.nonce(), h.hash) < key);
    headers.insert(pos, entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use causeway_primitives::Header;

    fn header(nonce: Nonce) -> HeaderVariant {
        HeaderVariant::Plain(Header {
            nonce,
            ..Default::default()
        })
    }

    #[test]
    fn test_empty_shard() {
        let notarizer = HeaderNotarizer::new();
        assert_eq!(
            notarizer.get_last_notarized_header(0).unwrap_err(),
            ProcessError::NilNotarizedHeaderSlice
        );
        assert!(notarizer.last_notarized_nonce(0).is_none());
        assert!(notarizer.get_notarized_header(0, 0).is_err());
    }

    #[test]
    fn test_last_and_offset() {
        let notarizer = HeaderNotarizer::new();
        notarizer.add_notarized_header(0, header(3), [3; 32]);
        notarizer.add_notarized_header(0, header(1), [1; 32]);
        notarizer.add_notarized_header(0, header(2), [2; 32]);

        assert_eq!(notarizer.get_last_notarized_header(0).unwrap().hash, [3; 32]);
        assert_eq!(notarizer.get_notarized_header(0, 2).unwrap().hash, [1; 32]);
        assert_eq!(
            notarizer.get_notarized_header(0, 3).unwrap_err(),
            ProcessError::NotarizedHeaderOffsetOutOfBound { offset: 3, len: 3 }
        );
    }

    #[test]
    fn test_replace_by_hash() {
        let notarizer = HeaderNotarizer::new();
        notarizer.add_notarized_header(0, header(1), [1; 32]);
        notarizer.add_notarized_header(0, header(1), [1; 32]);
        assert_eq!(notarizer.num_notarized(0), 1);
    }

    #[test]
    fn test_clean_keeps_last() {
        let notarizer = HeaderNotarizer::new();
        for n in 1..=5u8 {
            notarizer.add_notarized_header(0, header(n as u64), [n; 32]);
        }
        notarizer.clean_notarized_headers_behind_nonce(0, 4);
        assert_eq!(notarizer.num_notarized(0), 2);

        notarizer.clean_notarized_headers_behind_nonce(0, 100);
        assert_eq!(notarizer.num_notarized(0), 1);
        assert_eq!(notarizer.last_notarized_nonce(0), Some(5));
    }
}
