//! Processor version switch.
//!
//! Holds both processor versions and forwards every call to the active
//! one. The active version is re-evaluated on each confirmed epoch from
//! the v2 feature flag.

use std::sync::Arc;

use causeway_hostapi::EnableEpochsHandler;
use causeway_primitives::{Epoch, Hash, ResultTransaction, ReturnCode, UserAccount};
use parking_lot::Mutex;
use tracing::info;

use super::SmartContractProcessor;
use crate::error::ProcessResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorVersion {
    V1,
    V2,
}

/// Forwards to the processor version enabled for the current epoch.
pub struct ScProcessorProxy {
    v1: Arc<dyn SmartContractProcessor>,
    v2: Arc<dyn SmartContractProcessor>,
    epochs: Arc<dyn EnableEpochsHandler>,
    active: Mutex<ProcessorVersion>,
}

impl ScProcessorProxy {
    pub fn new(
        v1: Arc<dyn SmartContractProcessor>,
        v2: Arc<dyn SmartContractProcessor>,
        epochs: Arc<dyn EnableEpochsHandler>,
    ) -> Self {
        let active = version_for(epochs.as_ref());
        Self {
            v1,
            v2,
            epochs,
            active: Mutex::new(active),
        }
    }

    /// Re-select the active version after an epoch change.
    pub fn epoch_confirmed(&self, epoch: Epoch, _timestamp: u64) {
        let next = version_for(self.epochs.as_ref());
        let mut active = self.active.lock();
        if *active != next {
            info!(target: "sc_processor", epoch, from = ?*active, to = ?next, "switching processor version");
        }
        *active = next;
    }

    pub fn active_version(&self) -> ProcessorVersion {
        *self.active.lock()
    }

    fn processor(&self) -> Arc<dyn SmartContractProcessor> {
        match *self.active.lock() {
            ProcessorVersion::V1 => Arc::clone(&self.v1),
            ProcessorVersion::V2 => Arc::clone(&self.v2),
        }
    }
}

fn version_for(epochs: &dyn EnableEpochsHandler) -> ProcessorVersion {
    if epochs.is_sc_processor_v2_enabled() {
        ProcessorVersion::V2
    } else {
        ProcessorVersion::V1
    }
}

impl SmartContractProcessor for ScProcessorProxy {
    fn process_smart_contract_result(
        &self,
        scr: Option<&ResultTransaction>,
    ) -> ProcessResult<ReturnCode> {
        self.processor().process_smart_contract_result(scr)
    }

    fn execute_built_in_function(
        &self,
        tx: &ResultTransaction,
        sender: Option<&UserAccount>,
        receiver: &UserAccount,
    ) -> ProcessResult<ReturnCode> {
        self.processor()
            .execute_built_in_function(tx, sender, receiver)
    }

    fn process_if_error(
        &self,
        tx_hash: &Hash,
        tx: &ResultTransaction,
        return_code: ReturnCode,
        message: &str,
        snapshot: usize,
    ) -> ProcessResult<()> {
        self.processor()
            .process_if_error(tx_hash, tx, return_code, message, snapshot)
    }
}
