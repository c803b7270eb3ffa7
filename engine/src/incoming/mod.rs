//! Incoming main-chain headers.
//!
//! `IncomingHeaderProcessor::add_header` is the entry point for every
//! header the main-chain notifier delivers:
//!
//! 1. skip headers from rounds before notarization starts
//! 2. decode the events into result transactions and bridge confirmations
//! 3. build the extended header and add it to the headers pool
//! 4. confirm bridge operations (best-effort)
//! 5. add the result transactions to the transaction pool

pub mod events;
pub mod extended_header;

use std::sync::Arc;

use causeway_hostapi::{HeadersPool, OutgoingOperationsPool, TransactionPool};
use causeway_primitives::types::short_hex;
use causeway_primitives::{ExtendedHeader, Hash, Hasher, IncomingHeader, Round};
use tracing::{debug, info};

use crate::config::IncomingConfig;
use crate::error::{ProcessError, ProcessResult};

pub use events::{IncomingEventsProcessor, ProcessedEvents, ScrInfo};
pub use extended_header::{create_extended_header, ExtendedHeaderProcessor};

/// Receives main-chain headers and feeds the local pools.
pub struct IncomingHeaderProcessor {
    events: IncomingEventsProcessor,
    extended_headers: ExtendedHeaderProcessor,
    main_chain_notarization_start_round: Round,
}

impl IncomingHeaderProcessor {
    pub fn new(
        config: &IncomingConfig,
        headers_pool: Arc<dyn HeadersPool>,
        tx_pool: Arc<dyn TransactionPool>,
        outgoing_pool: Arc<dyn OutgoingOperationsPool>,
        hasher: Arc<dyn Hasher>,
    ) -> Self {
        Self {
            events: IncomingEventsProcessor::new(tx_pool, outgoing_pool, Arc::clone(&hasher)),
            extended_headers: ExtendedHeaderProcessor::new(headers_pool, hasher),
            main_chain_notarization_start_round: config.main_chain_notarization_start_round,
        }
    }

    /// Process one incoming header identified by its main-chain hash.
    pub fn add_header(&self, hash: &Hash, incoming: &IncomingHeader) -> ProcessResult<()> {
        let header = incoming.header.as_ref().ok_or(ProcessError::NilHeader)?;
        info!(
            target: "incoming",
            hash = %short_hex(hash),
            nonce = header.nonce,
            round = header.round,
            "received incoming header"
        );

        if header.round < self.main_chain_notarization_start_round {
            debug!(
                target: "incoming",
                round = header.round,
                start_round = self.main_chain_notarization_start_round,
                "header round is before notarization start, skipped"
            );
            return Ok(());
        }

        let processed = self.events.process_incoming_events(&incoming.events)?;
        let extended = create_extended_header(
            incoming,
            &processed.scrs,
            &processed.confirmed_bridge_ops,
        )?;
        self.extended_headers.add_extended_header_to_pool(extended)?;

        self.events
            .add_confirmed_bridge_ops_to_pool(&processed.confirmed_bridge_ops);
        self.events.add_scrs_to_pool(&processed.scrs)
    }

    /// Build the extended header without touching any pool.
    pub fn create_extended_header(&self, incoming: &IncomingHeader) -> ProcessResult<ExtendedHeader> {
        let processed = self.events.process_incoming_events(&incoming.events)?;
        create_extended_header(incoming, &processed.scrs, &processed.confirmed_bridge_ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causeway_hostapi::{MemHeadersPool, MemOutgoingOperations, MemTxPool};
    use causeway_primitives::{Blake3Hasher, Header, IncomingEvent};

    struct Fixture {
        proc: IncomingHeaderProcessor,
        headers: Arc<MemHeadersPool>,
        txs: Arc<MemTxPool>,
    }

    fn fixture(start_round: Round) -> Fixture {
        let headers = Arc::new(MemHeadersPool::new());
        let txs = Arc::new(MemTxPool::new());
        let proc = IncomingHeaderProcessor::new(
            &IncomingConfig {
                main_chain_notarization_start_round: start_round,
            },
            headers.clone(),
            txs.clone(),
            Arc::new(MemOutgoingOperations::new()),
            Arc::new(Blake3Hasher),
        );
        Fixture { proc, headers, txs }
    }

    fn incoming(round: Round) -> IncomingHeader {
        IncomingHeader {
            header: Some(Header {
                round,
                nonce: round,
                ..Default::default()
            }),
            events: vec![IncomingEvent {
                identifier: events::EVENT_ID_DEPOSIT.to_vec(),
                topics: vec![vec![3; 32], b"TKN".to_vec(), vec![], vec![1]],
                data: b"@\x01@\x0a@6465706f736974".to_vec(),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_add_header_feeds_pools() {
        let f = fixture(0);
        f.proc.add_header(&[1; 32], &incoming(10)).unwrap();
        assert_eq!(f.headers.len(), 1);
        assert_eq!(f.txs.len(), 1);
    }

    #[test]
    fn test_round_before_start_is_skipped() {
        let f = fixture(100);
        f.proc.add_header(&[1; 32], &incoming(99)).unwrap();
        assert!(f.headers.is_empty());
        assert!(f.txs.is_empty());

        f.proc.add_header(&[1; 32], &incoming(100)).unwrap();
        assert_eq!(f.headers.len(), 1);
    }

    #[test]
    fn test_nil_header() {
        let f = fixture(0);
        let err = f.proc.add_header(&[1; 32], &IncomingHeader::default()).unwrap_err();
        assert_eq!(err, ProcessError::NilHeader);
    }

    #[test]
    fn test_invalid_event_writes_nothing() {
        let f = fixture(0);
        let mut bad = incoming(10);
        bad.events[0].data.clear();
        assert!(f.proc.add_header(&[1; 32], &bad).is_err());
        assert!(f.headers.is_empty());
        assert!(f.txs.is_empty());
    }

    #[test]
    fn test_preview_does_not_write() {
        let f = fixture(0);
        let ext = f.proc.create_extended_header(&incoming(10)).unwrap();
        assert_eq!(ext.incoming_mini_blocks.len(), 1);
        assert!(f.headers.is_empty());
        assert!(f.txs.is_empty());
    }
}
