//! Progress reporting and cooperative cancellation for long-running sync.
//!
//! `SyncStatistics` is updated by the sync workers. A
//! `SyncProgressReporter` prints it on a background thread at a fixed
//! interval until stopped. `SyncGate` stops admitting new work once
//! cancelled and lets admitted work drain.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use causeway_hostapi::HostError;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::info;

use crate::error::ProcessResult;

/// Counters shared by sync workers.
#[derive(Debug, Default)]
pub struct SyncStatistics {
    received: AtomicU64,
    large: AtomicU64,
    missing: AtomicU64,
}

impl SyncStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_num_received(&self, n: u64) {
        self.received.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_num_large(&self) {
        self.large.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_num_missing(&self, n: u64) {
        self.missing.store(n, Ordering::Relaxed);
    }

    pub fn num_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn num_large(&self) -> u64 {
        self.large.load(Ordering::Relaxed)
    }

    pub fn num_missing(&self) -> u64 {
        self.missing.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.received.store(0, Ordering::Relaxed);
        self.large.store(0, Ordering::Relaxed);
        self.missing.store(0, Ordering::Relaxed);
    }
}

/// Background thread logging [`SyncStatistics`] every interval.
pub struct SyncProgressReporter {
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
    prints: Arc<AtomicU64>,
}

impl SyncProgressReporter {
    pub fn start(name: &str, stats: Arc<SyncStatistics>, interval: Duration) -> ProcessResult<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let prints = Arc::new(AtomicU64::new(0));

        let worker_prints = Arc::clone(&prints);
        let name = name.to_string();
        let worker = thread::Builder::new()
            .name(format!("sync-progress-{name}"))
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        worker_prints.fetch_add(1, Ordering::Relaxed);
                        info!(
                            target: "sync",
                            name = %name,
                            num_received = stats.num_received(),
                            num_large = stats.num_large(),
                            num_missing = stats.num_missing(),
                            "sync in progress"
                        );
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        info!(
                            target: "sync",
                            name = %name,
                            num_received = stats.num_received(),
                            num_large = stats.num_large(),
                            num_missing = stats.num_missing(),
                            "finished sync"
                        );
                        return;
                    }
                }
            })
            .map_err(|e| HostError::internal(format!("cannot spawn sync progress thread: {e}")))?;

        Ok(Self {
            stop: Some(stop_tx),
            worker: Some(worker),
            prints,
        })
    }

    /// Number of progress lines printed so far.
    pub fn num_prints(&self) -> u64 {
        self.prints.load(Ordering::Relaxed)
    }

    /// Stop the reporter and wait for its final line.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.try_send(());
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for SyncProgressReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Debug, Default)]
struct GateState {
    cancelled: bool,
    in_flight: usize,
}

/// Admission control for sync work.
#[derive(Debug, Default)]
pub struct SyncGate {
    state: Mutex<GateState>,
    drained: Condvar,
}

/// Admitted unit of work; released on drop.
#[must_use]
pub struct SyncPermit<'a> {
    gate: &'a SyncGate,
}

impl SyncGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit one unit of work, or `None` once cancelled.
    pub fn admit(&self) -> Option<SyncPermit<'_>> {
        let mut state = self.state.lock();
        if state.cancelled {
            return None;
        }
        state.in_flight += 1;
        Some(SyncPermit { gate: self })
    }

    /// Stop admitting work. Admitted work keeps running.
    pub fn cancel(&self) {
        self.state.lock().cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    /// Cancel, then wait up to `timeout` for admitted work to finish.
    ///
    /// Returns true if nothing is left in flight.
    pub fn drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        state.cancelled = true;
        while state.in_flight > 0 {
            if self.drained.wait_until(&mut state, deadline).timed_out() {
                return state.in_flight == 0;
            }
        }
        true
    }
}

impl Drop for SyncPermit<'_> {
    fn drop(&mut self) {
        let mut state = self.gate.state.lock();
        state.in_flight -= 1;
        if state.in_flight == 0 {
            self.gate.drained.notify_all();
        }
    }
}
