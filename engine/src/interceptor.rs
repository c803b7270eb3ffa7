//! Header interceptor processor.
//!
//! Admits intercepted headers before they reach the headers pool:
//!
//! 1. `validate` rejects non-header data, blacklisted hashes, missing
//!    headers and rounds excluded after a hardfork.
//! 2. `save` hands the header to every registered subscriber on a
//!    background notifier thread, then inserts it into the headers pool.
//!    Callers must not assume subscribers have seen the header when
//!    `save` returns.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use causeway_hostapi::{BlacklistCache, HardforkExclusionHandler, HeadersPool, HostError};
use causeway_primitives::types::short_hex;
use causeway_primitives::{ChainError, Hash, HeaderVariant, TxVariant};
use crossbeam_channel::{unbounded, Sender};
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::error::{ProcessError, ProcessResult};

/// Subscriber called with `(topic, hash, header)` for every saved header.
pub type InterceptedHeaderHandler = Arc<dyn Fn(&str, &Hash, &HeaderVariant) + Send + Sync>;

/// A header received from the network, with its precomputed hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedHeader {
    pub hash: Hash,
    pub header: Option<HeaderVariant>,
}

/// Closed set of data an interceptor can receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptedData {
    Header(InterceptedHeader),
    Transaction { hash: Hash, tx: TxVariant },
}

impl InterceptedData {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Header(_) => "header",
            Self::Transaction { .. } => "transaction",
        }
    }

    fn as_header(&self) -> ProcessResult<&InterceptedHeader> {
        match self {
            Self::Header(hdr) => Ok(hdr),
            other => Err(ChainError::UnsupportedVariant {
                expected: "header",
                got: other.kind(),
            }
            .into()),
        }
    }
}

struct Notification {
    topic: String,
    hash: Hash,
    header: HeaderVariant,
}

/// Validates and saves intercepted headers.
pub struct HdrInterceptorProcessor {
    headers: Arc<dyn HeadersPool>,
    blacklist: Arc<dyn BlacklistCache>,
    hardfork_exclusion: Arc<dyn HardforkExclusionHandler>,
    handlers: Arc<RwLock<Vec<InterceptedHeaderHandler>>>,
    notifier: Option<Sender<Notification>>,
    worker: Option<JoinHandle<()>>,
}

impl HdrInterceptorProcessor {
    /// Create the processor and start its notifier thread.
    pub fn new(
        headers: Arc<dyn HeadersPool>,
        blacklist: Arc<dyn BlacklistCache>,
        hardfork_exclusion: Arc<dyn HardforkExclusionHandler>,
    ) -> ProcessResult<Self> {
        let handlers: Arc<RwLock<Vec<InterceptedHeaderHandler>>> = Arc::default();
        let (tx, rx) = unbounded::<Notification>();

        let worker_handlers = Arc::clone(&handlers);
        let worker = thread::Builder::new()
            .name("hdr-notifier".into())
            .spawn(move || {
                for n in rx.iter() {
                    let subscribers = worker_handlers.read().clone();
                    for handler in subscribers {
                        let called = catch_unwind(AssertUnwindSafe(|| {
                            handler(&n.topic, &n.hash, &n.header)
                        }));
                        if called.is_err() {
                            warn!(
                                target: "interceptor",
                                hash = %short_hex(&n.hash),
                                "header subscriber panicked"
                            );
                        }
                    }
                }
            })
            .map_err(|e| HostError::internal(format!("cannot spawn notifier thread: {e}")))?;

        Ok(Self {
            headers,
            blacklist,
            hardfork_exclusion,
            handlers,
            notifier: Some(tx),
            worker: Some(worker),
        })
    }

    /// Check whether an intercepted header may be admitted.
    pub fn validate(&self, data: &InterceptedData, _peer: &str) -> ProcessResult<()> {
        let intercepted = data.as_header()?;

        self.blacklist.sweep();
        if self.blacklist.has(&intercepted.hash) {
            debug!(target: "interceptor", hash = %short_hex(&intercepted.hash), "header is blacklisted");
            return Err(ProcessError::HeaderBlackListed);
        }

        let header = intercepted.header.as_ref().ok_or(ProcessError::NilHeader)?;

        let round = header.round();
        if self.hardfork_exclusion.is_round_excluded(round) {
            return Err(ProcessError::ExcludedHeader { round });
        }

        Ok(())
    }

    /// Notify subscribers (asynchronously) and add the header to the pool.
    pub fn save(&self, data: &InterceptedData, _peer: &str, topic: &str) -> ProcessResult<()> {
        let intercepted = data.as_header()?;
        let header = intercepted.header.as_ref().ok_or(ProcessError::NilHeader)?;

        if let Some(notifier) = &self.notifier {
            let sent = notifier.send(Notification {
                topic: topic.to_string(),
                hash: intercepted.hash,
                header: header.clone(),
            });
            if sent.is_err() {
                warn!(target: "interceptor", "notifier thread is gone, subscribers skipped");
            }
        }

        let added = self.headers.add_header(intercepted.hash, header.clone());
        trace!(
            target: "interceptor",
            hash = %short_hex(&intercepted.hash),
            nonce = header.nonce(),
            added,
            "header saved"
        );
        Ok(())
    }

    /// Subscribe to saved headers. `None` is ignored.
    pub fn register_handler(&self, handler: Option<InterceptedHeaderHandler>) {
        let Some(handler) = handler else {
            return;
        };
        self.handlers.write().push(handler);
    }

    pub fn num_handlers(&self) -> usize {
        self.handlers.read().len()
    }
}

impl Drop for HdrInterceptorProcessor {
    fn drop(&mut self) {
        // closing the channel ends the worker once queued notifications drain
        self.notifier.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
