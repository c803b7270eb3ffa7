//! Sovereign smart contract result processor.
//!
//! Incoming result transactions are built-in function calls (token
//! transfers), optionally followed by a call into the receiving contract.
//! Every execution runs against a journal snapshot: on any failure the
//! accounts are reverted to it and a failed VM output is recorded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use causeway_hostapi::{
    AccountsAdapter, BlockchainHook, HostError, IntermediateResultsForwarder, TxLogsProcessor,
    VmContainer, VmOutputCache,
};
use causeway_primitives::types::short_hex;
use causeway_primitives::vm::SIGNAL_ERROR_IDENTIFIER;
use causeway_primitives::{
    calculate_hash, Address, CallType, ContractCallInput, Hash, Hasher, LogEntry, ResultTransaction,
    ReturnCode, ShardCoordinator, UserAccount, VmOutput,
};
use parking_lot::RwLock;
use tracing::{debug, trace};

use super::args_parser::parse_call_data;
use super::esdt_parser::parse_esdt_transfers;
use super::tx_type::{TransactionType, TxTypeHandler};
use super::SmartContractProcessor;
use crate::error::{ProcessError, ProcessResult};

/// Collaborators of [`SovereignScProcessor`].
pub struct ScProcessorArgs {
    pub accounts: Arc<dyn AccountsAdapter>,
    pub shard_coordinator: Arc<dyn ShardCoordinator>,
    pub blockchain_hook: Arc<dyn BlockchainHook>,
    pub vm_container: Arc<dyn VmContainer>,
    pub tx_logs: Arc<dyn TxLogsProcessor>,
    pub vm_outputs: Arc<dyn VmOutputCache>,
    pub results_forwarder: Arc<dyn IntermediateResultsForwarder>,
    pub hasher: Arc<dyn Hasher>,
    pub tx_type_handler: TxTypeHandler,
    /// Held for reading while a VM is looked up and run; writers swap VMs.
    pub vm_change_lock: Arc<RwLock<()>>,
    pub execute_duration_alarm_threshold: Duration,
}

/// Executes incoming result transactions.
pub struct SovereignScProcessor {
    accounts: Arc<dyn AccountsAdapter>,
    shard_coordinator: Arc<dyn ShardCoordinator>,
    blockchain_hook: Arc<dyn BlockchainHook>,
    vm_container: Arc<dyn VmContainer>,
    tx_logs: Arc<dyn TxLogsProcessor>,
    vm_outputs: Arc<dyn VmOutputCache>,
    results_forwarder: Arc<dyn IntermediateResultsForwarder>,
    hasher: Arc<dyn Hasher>,
    tx_type_handler: TxTypeHandler,
    vm_change_lock: Arc<RwLock<()>>,
    execute_duration_alarm_threshold: Duration,
}

/// A contract call to run after a transfer built-in.
struct PostTransferCall {
    input: ContractCallInput,
    destination: Address,
}

impl SovereignScProcessor {
    pub fn new(args: ScProcessorArgs) -> Self {
        Self {
            accounts: args.accounts,
            shard_coordinator: args.shard_coordinator,
            blockchain_hook: args.blockchain_hook,
            vm_container: args.vm_container,
            tx_logs: args.tx_logs,
            vm_outputs: args.vm_outputs,
            results_forwarder: args.results_forwarder,
            hasher: args.hasher,
            tx_type_handler: args.tx_type_handler,
            vm_change_lock: args.vm_change_lock,
            execute_duration_alarm_threshold: args.execute_duration_alarm_threshold,
        }
    }

    fn do_execute_built_in_function(
        &self,
        tx: &ResultTransaction,
        tx_hash: Hash,
        receiver: &UserAccount,
    ) -> ProcessResult<ReturnCode> {
        self.blockchain_hook.reset_counters();
        self.accounts.save_account(receiver.clone())?;
        let snapshot = self.accounts.journal_len();

        let input = match self.create_vm_call_input(tx, tx_hash) {
            Ok(input) => input,
            Err(err) => {
                let message = format!("cannot create VMInput, check the transaction data field: {err}");
                self.process_if_error(&tx_hash, tx, ReturnCode::UserError, &message, snapshot)?;
                return Ok(ReturnCode::UserError);
            }
        };

        let mut vm_output = self
            .blockchain_hook
            .process_built_in_function(&input)
            .unwrap_or_else(|err| VmOutput::with_code(ReturnCode::UserError, err.to_string()));

        if input.return_call_after_error && input.call_type != CallType::AsynchronousCallBack {
            return self.finish_sc_execution(Vec::new(), tx_hash, tx, vm_output, snapshot);
        }

        if !vm_output.return_code.is_ok() {
            let message = vm_output.return_message.clone();
            self.process_if_error(&tx_hash, tx, vm_output.return_code, &message, snapshot)?;
            return Ok(ReturnCode::UserError);
        }

        let post_transfer = self.sc_execution_after_built_in_func(tx, tx_hash, &input, &vm_output);
        let mut results = create_smart_contract_results(&vm_output, tx, tx_hash);

        if let Some(call) = post_transfer {
            let call_output = match self.execute_smart_contract_call(&call) {
                Ok(output) => output,
                Err(message) => {
                    self.process_if_error(&tx_hash, tx, ReturnCode::UserError, &message, snapshot)?;
                    return Ok(ReturnCode::UserError);
                }
            };

            if let Err(err) = self.process_sc_output_accounts(&call_output) {
                let message = err.to_string();
                self.process_if_error(&tx_hash, tx, ReturnCode::ExecutionFailed, &message, snapshot)?;
                return Ok(ReturnCode::ExecutionFailed);
            }

            results.extend(create_smart_contract_results(&call_output, tx, tx_hash));
            vm_output.logs.extend(call_output.logs);
            vm_output.gas_remaining = call_output.gas_remaining;
        }

        self.finish_sc_execution(results, tx_hash, tx, vm_output, snapshot)
    }

    fn create_vm_call_input(
        &self,
        tx: &ResultTransaction,
        tx_hash: Hash,
    ) -> ProcessResult<ContractCallInput> {
        let (function, arguments) = parse_call_data(&tx.data)?;
        let esdt_transfers = parse_esdt_transfers(&tx.sender, &tx.receiver, &function, &arguments)
            .map(|parsed| parsed.esdt_transfers)
            .unwrap_or_default();

        Ok(ContractCallInput {
            caller: tx.sender,
            recipient: tx.receiver,
            function,
            arguments,
            call_value: tx.value,
            call_type: tx.call_type,
            gas_provided: tx.gas_limit,
            gas_locked: 0,
            current_tx_hash: tx_hash,
            original_tx_hash: tx.original_tx_hash.unwrap_or(tx_hash),
            esdt_transfers,
            return_call_after_error: !tx.return_message.is_empty(),
        })
    }

    /// The contract call requested by a transfer built-in, if any: the
    /// call data names a function, the destination is in this shard and
    /// its output account carries exactly one transfer.
    fn sc_execution_after_built_in_func(
        &self,
        tx: &ResultTransaction,
        tx_hash: Hash,
        input: &ContractCallInput,
        vm_output: &VmOutput,
    ) -> Option<PostTransferCall> {
        let parsed =
            parse_esdt_transfers(&tx.sender, &tx.receiver, &input.function, &input.arguments)
                .ok()?;
        if parsed.call_function.is_empty() {
            return None;
        }
        if !self.shard_coordinator.is_self(&parsed.receiver) {
            return None;
        }
        let account = vm_output.output_accounts.get(&parsed.receiver)?;
        let [transfer] = account.output_transfers.as_slice() else {
            return None;
        };

        Some(PostTransferCall {
            destination: parsed.receiver,
            input: ContractCallInput {
                caller: tx.sender,
                recipient: parsed.receiver,
                function: parsed.call_function,
                arguments: parsed.call_args,
                call_value: 0,
                call_type: tx.call_type,
                gas_provided: transfer.gas_limit,
                gas_locked: 0,
                current_tx_hash: tx_hash,
                original_tx_hash: input.original_tx_hash,
                esdt_transfers: parsed.esdt_transfers,
                return_call_after_error: false,
            },
        })
    }

    /// Run the post-transfer call. Errors come back as the message to
    /// record for the failed transaction.
    fn execute_smart_contract_call(&self, call: &PostTransferCall) -> Result<VmOutput, String> {
        let _vm_guard = self.vm_change_lock.read();

        let vm = self
            .vm_container
            .find_vm_by_address(&call.destination)
            .map_err(|err| err.to_string())?;
        let output = vm
            .run_smart_contract_call(&call.input)
            .map_err(|err| err.to_string())?
            .ok_or_else(|| ProcessError::NilVmOutput.to_string())?;

        if !output.return_code.is_ok() {
            return Err(format!("{}: {}", output.return_code, output.return_message));
        }
        Ok(output)
    }

    /// Apply balance, nonce and storage changes of every output account
    /// in this shard.
    fn process_sc_output_accounts(&self, output: &VmOutput) -> ProcessResult<()> {
        for (address, out) in &output.output_accounts {
            if !self.shard_coordinator.is_self(address) {
                continue;
            }
            let mut account = self.accounts.load_account(address)?;
            account
                .apply_balance_delta(out.balance_delta)
                .ok_or(HostError::out_of_funds())?;
            if let Some(nonce) = out.nonce {
                account.nonce = nonce;
            }
            for (key, value) in &out.storage_updates {
                if value.is_empty() {
                    account.storage.remove(key);
                } else {
                    account.storage.insert(key.clone(), value.clone());
                }
            }
            self.accounts.save_account(account)?;
        }
        Ok(())
    }

    fn finish_sc_execution(
        &self,
        results: Vec<ResultTransaction>,
        tx_hash: Hash,
        tx: &ResultTransaction,
        vm_output: VmOutput,
        snapshot: usize,
    ) -> ProcessResult<ReturnCode> {
        if !results.is_empty() {
            if let Err(err) = self.results_forwarder.add_intermediate_transactions(results) {
                self.accounts.revert_to_snapshot(snapshot)?;
                return Err(err.into());
            }
        }
        if let Err(err) = self.tx_logs.save_log(&tx_hash, tx, &vm_output.logs) {
            debug!(target: "sc_processor", tx_hash = %short_hex(&tx_hash), error = %err, "cannot save log");
        }
        self.vm_outputs.put(tx_hash, vm_output);
        Ok(ReturnCode::Ok)
    }

    fn print_blockchain_hook_counters(&self, tx_hash: &Hash) {
        let counters = self.blockchain_hook.get_counter_values();
        if counters.is_empty() {
            return;
        }
        let line = counters
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join(", ");
        trace!(target: "sc_processor", tx_hash = %short_hex(tx_hash), counters = %line, "blockchain hook counters");
    }
}

impl SmartContractProcessor for SovereignScProcessor {
    fn process_smart_contract_result(
        &self,
        scr: Option<&ResultTransaction>,
    ) -> ProcessResult<ReturnCode> {
        let scr = scr.ok_or(ProcessError::NilSmartContractResult)?;
        trace!(
            target: "sc_processor",
            nonce = scr.nonce,
            value = scr.value,
            data = %String::from_utf8_lossy(&scr.data),
            "processing smart contract result"
        );

        if !self.shard_coordinator.is_self(&scr.receiver) {
            return Err(ProcessError::NilSCDestAccount);
        }
        let receiver = self.accounts.load_account(&scr.receiver)?;

        match self.tx_type_handler.compute_transaction_type(scr) {
            TransactionType::BuiltInFunctionCall => {
                self.execute_built_in_function(scr, None, &receiver)
            }
            _ => Err(ProcessError::WrongTransaction),
        }
    }

    fn execute_built_in_function(
        &self,
        tx: &ResultTransaction,
        _sender: Option<&UserAccount>,
        receiver: &UserAccount,
    ) -> ProcessResult<ReturnCode> {
        let tx_hash = calculate_hash(self.hasher.as_ref(), tx);
        let started = Instant::now();

        let result = self.do_execute_built_in_function(tx, tx_hash, receiver);

        let elapsed = started.elapsed();
        if elapsed > self.execute_duration_alarm_threshold {
            debug!(
                target: "sc_processor",
                tx_hash = %short_hex(&tx_hash),
                elapsed = ?elapsed,
                "execute built in function took too long"
            );
        } else {
            trace!(target: "sc_processor", tx_hash = %short_hex(&tx_hash), elapsed = ?elapsed, "built in function executed");
        }
        self.print_blockchain_hook_counters(&tx_hash);

        result
    }

    fn process_if_error(
        &self,
        tx_hash: &Hash,
        tx: &ResultTransaction,
        return_code: ReturnCode,
        message: &str,
        snapshot: usize,
    ) -> ProcessResult<()> {
        self.accounts.revert_to_snapshot(snapshot)?;
        debug!(
            target: "sc_processor",
            tx_hash = %short_hex(tx_hash),
            %return_code,
            reason = message,
            "smart contract result failed, state reverted"
        );

        let log = LogEntry {
            identifier: SIGNAL_ERROR_IDENTIFIER.to_vec(),
            address: tx.receiver,
            topics: vec![tx.sender.to_vec(), message.as_bytes().to_vec()],
            data: return_code.to_string().into_bytes(),
        };
        if let Err(err) = self.tx_logs.save_log(tx_hash, tx, &[log]) {
            debug!(target: "sc_processor", error = %err, "cannot save error log");
        }

        self.vm_outputs
            .put(*tx_hash, VmOutput::with_code(return_code, message));
        Ok(())
    }
}

/// One result transaction per output transfer, accounts in address order
/// and nonces counting transfers within an account.
fn create_smart_contract_results(
    output: &VmOutput,
    tx: &ResultTransaction,
    tx_hash: Hash,
) -> Vec<ResultTransaction> {
    let original_tx_hash = tx.original_tx_hash.unwrap_or(tx_hash);
    let original_sender = tx.original_sender.unwrap_or(tx.sender);

    output
        .output_accounts
        .iter()
        .flat_map(|(address, account)| {
            account
                .output_transfers
                .iter()
                .enumerate()
                .map(move |(index, transfer)| ResultTransaction {
                    nonce: index as u64,
                    value: transfer.value,
                    receiver: *address,
                    sender: transfer.sender.unwrap_or(tx.receiver),
                    data: transfer.data.clone(),
                    prev_tx_hash: Some(tx_hash),
                    original_tx_hash: Some(original_tx_hash),
                    gas_limit: transfer.gas_limit,
                    gas_price: tx.gas_price,
                    call_type: transfer.call_type,
                    original_sender: Some(original_sender),
                    return_message: Vec::new(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use causeway_hostapi::{
        MemAccounts, MemResultsForwarder, MemTxLogs, MemVmOutputCache, VmExecutor,
    };
    use causeway_primitives::{
        Blake3Hasher, MultiShardCoordinator, OutputAccount, OutputTransfer,
        SovereignShardCoordinator,
    };

    const RECEIVER: Address = [0x11; 32];

    /// Credits the receiver with the call value and, when asked, leaves a
    /// transfer behind for a post-transfer call.
    struct StubHook {
        accounts: Arc<MemAccounts>,
        fail: bool,
        with_transfer: bool,
        resets: AtomicUsize,
    }

    impl BlockchainHook for StubHook {
        fn process_built_in_function(&self, input: &ContractCallInput) -> Result<VmOutput, HostError> {
            let mut account = self.accounts.load_account(&input.recipient)?;
            account.balance += 10;
            self.accounts.save_account(account)?;
            if self.fail {
                return Ok(VmOutput::with_code(ReturnCode::UserError, "denied"));
            }

            let mut output = VmOutput::default();
            if self.with_transfer {
                output.output_accounts.insert(
                    input.recipient,
                    OutputAccount {
                        address: input.recipient,
                        output_transfers: vec![OutputTransfer {
                            gas_limit: 77,
                            ..Default::default()
                        }],
                        ..Default::default()
                    },
                );
            }
            Ok(output)
        }

        fn reset_counters(&self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }

        fn get_counter_values(&self) -> BTreeMap<String, u64> {
            BTreeMap::from([("calls".to_string(), 1)])
        }
    }

    struct StubVm {
        output: Option<VmOutput>,
    }

    impl VmExecutor for StubVm {
        fn run_smart_contract_call(
            &self,
            input: &ContractCallInput,
        ) -> Result<Option<VmOutput>, HostError> {
            assert_eq!(input.gas_provided, 77);
            Ok(self.output.clone())
        }
    }

    struct StubContainer {
        vm: Option<Arc<dyn VmExecutor>>,
    }

    impl VmContainer for StubContainer {
        fn find_vm_by_address(&self, _address: &Address) -> Result<Arc<dyn VmExecutor>, HostError> {
            self.vm.clone().ok_or_else(|| HostError::vm_not_found("no vm"))
        }
    }

    struct Fixture {
        processor: SovereignScProcessor,
        accounts: Arc<MemAccounts>,
        logs: Arc<MemTxLogs>,
        outputs: Arc<MemVmOutputCache>,
        forwarder: Arc<MemResultsForwarder>,
    }

    fn fixture(fail: bool, with_transfer: bool, vm_output: Option<VmOutput>) -> Fixture {
        let accounts = Arc::new(MemAccounts::new());
        let logs = Arc::new(MemTxLogs::new());
        let outputs = Arc::new(MemVmOutputCache::new());
        let forwarder = Arc::new(MemResultsForwarder::new());
        let hook = Arc::new(StubHook {
            accounts: accounts.clone(),
            fail,
            with_transfer,
            resets: AtomicUsize::new(0),
        });
        let vm: Arc<dyn VmExecutor> = Arc::new(StubVm { output: vm_output });
        let processor = SovereignScProcessor::new(ScProcessorArgs {
            accounts: accounts.clone(),
            shard_coordinator: Arc::new(SovereignShardCoordinator),
            blockchain_hook: hook,
            vm_container: Arc::new(StubContainer { vm: Some(vm) }),
            tx_logs: logs.clone(),
            vm_outputs: outputs.clone(),
            results_forwarder: forwarder.clone(),
            hasher: Arc::new(Blake3Hasher),
            tx_type_handler: TxTypeHandler::default(),
            vm_change_lock: Arc::default(),
            execute_duration_alarm_threshold: Duration::from_millis(100),
        });
        Fixture {
            processor,
            accounts,
            logs,
            outputs,
            forwarder,
        }
    }

    fn transfer_scr(function: Option<&str>) -> ResultTransaction {
        let call = function
            .map(|f| format!("@{}", hex::encode(f)))
            .unwrap_or_default();
        ResultTransaction {
            receiver: RECEIVER,
            sender: [0xee; 32],
            data: format!("MultiESDTNFTTransfer@01@{}@@05{call}", hex::encode("TKN")).into_bytes(),
            gas_limit: 100,
            ..Default::default()
        }
    }

    fn balance(accounts: &MemAccounts) -> u128 {
        accounts.load_account(&RECEIVER).unwrap().balance
    }

    #[test]
    fn test_nil_and_wrong_transactions() {
        let f = fixture(false, false, None);
        assert_eq!(
            f.processor.process_smart_contract_result(None).unwrap_err(),
            ProcessError::NilSmartContractResult
        );

        let plain = ResultTransaction {
            receiver: RECEIVER,
            data: b"claim".to_vec(),
            ..Default::default()
        };
        assert_eq!(
            f.processor
                .process_smart_contract_result(Some(&plain))
                .unwrap_err(),
            ProcessError::WrongTransaction
        );
    }

    #[test]
    fn test_receiver_in_other_shard() {
        let mut f = fixture(false, false, None);
        f.processor.shard_coordinator = Arc::new(MultiShardCoordinator::new(2, 0).unwrap());
        let mut scr = transfer_scr(None);
        scr.receiver[31] = 1;
        assert_eq!(
            f.processor
                .process_smart_contract_result(Some(&scr))
                .unwrap_err(),
            ProcessError::NilSCDestAccount
        );
    }

    #[test]
    fn test_built_in_success() {
        let f = fixture(false, false, None);
        let scr = transfer_scr(None);
        let code = f.processor.process_smart_contract_result(Some(&scr)).unwrap();
        assert_eq!(code, ReturnCode::Ok);
        assert_eq!(balance(&f.accounts), 10);

        let hash = calculate_hash(&Blake3Hasher, &scr);
        assert_eq!(f.outputs.get(&hash).unwrap().return_code, ReturnCode::Ok);
        assert!(f.logs.get_log(&hash).is_none());
    }

    #[test]
    fn test_built_in_failure_reverts() {
        let f = fixture(true, false, None);
        let scr = transfer_scr(None);

        let code = f.processor.process_smart_contract_result(Some(&scr)).unwrap();
        assert_eq!(code, ReturnCode::UserError);
        // the hook credited the receiver before failing
        assert_eq!(balance(&f.accounts), 0);

        let hash = calculate_hash(&Blake3Hasher, &scr);
        assert_eq!(f.outputs.get(&hash).unwrap().return_code, ReturnCode::UserError);
        let log = f.logs.get_log(&hash).unwrap();
        assert_eq!(log[0].identifier, SIGNAL_ERROR_IDENTIFIER.to_vec());
    }

    #[test]
    fn test_bad_call_data_is_user_error() {
        let f = fixture(false, false, None);
        let scr = ResultTransaction {
            receiver: RECEIVER,
            data: b"MultiESDTNFTTransfer@zz".to_vec(),
            ..Default::default()
        };
        let code = f
            .processor
            .execute_built_in_function(&scr, None, &UserAccount::new(RECEIVER))
            .unwrap();
        assert_eq!(code, ReturnCode::UserError);
        let hash = calculate_hash(&Blake3Hasher, &scr);
        assert!(f.outputs.get(&hash).unwrap().return_message.contains("VMInput"));
    }

    #[test]
    fn test_transfer_results_are_forwarded() {
        let f = fixture(false, true, None);
        let scr = transfer_scr(None);
        f.processor.process_smart_contract_result(Some(&scr)).unwrap();

        let results = f.forwarder.all();
        assert_eq!(results.len(), 1);
        let hash = calculate_hash(&Blake3Hasher, &scr);
        assert_eq!(results[0].prev_tx_hash, Some(hash));
        assert_eq!(results[0].nonce, 0);
        assert_eq!(results[0].gas_limit, 77);
    }

    #[test]
    fn test_post_transfer_call_applies_output() {
        let mut call_output = VmOutput::default();
        call_output.output_accounts.insert(
            RECEIVER,
            OutputAccount {
                address: RECEIVER,
                balance_delta: 5,
                storage_updates: BTreeMap::from([(b"k".to_vec(), b"v".to_vec())]),
                ..Default::default()
            },
        );
        let f = fixture(false, true, Some(call_output));
        let scr = transfer_scr(Some("swap"));

        let code = f.processor.process_smart_contract_result(Some(&scr)).unwrap();
        assert_eq!(code, ReturnCode::Ok);
        let account = f.accounts.load_account(&RECEIVER).unwrap();
        assert_eq!(account.balance, 15);
        assert_eq!(account.storage.get(b"k".as_slice()), Some(&b"v".to_vec()));
        // the built-in transfer is still reported as a result
        let results = f.forwarder.all();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].receiver, RECEIVER);
    }

    #[test]
    fn test_post_transfer_call_without_output_reverts() {
        let f = fixture(false, true, None);
        let scr = transfer_scr(Some("swap"));

        let code = f.processor.process_smart_contract_result(Some(&scr)).unwrap();
        assert_eq!(code, ReturnCode::UserError);
        assert_eq!(balance(&f.accounts), 0);
        assert!(f.forwarder.all().is_empty());
    }

    #[test]
    fn test_post_transfer_call_out_of_funds_is_execution_failed() {
        let mut call_output = VmOutput::default();
        call_output.output_accounts.insert(
            RECEIVER,
            OutputAccount {
                address: RECEIVER,
                balance_delta: -1_000,
                ..Default::default()
            },
        );
        let f = fixture(false, true, Some(call_output));
        let code = f
            .processor
            .process_smart_contract_result(Some(&transfer_scr(Some("swap"))))
            .unwrap();
        assert_eq!(code, ReturnCode::ExecutionFailed);
        assert_eq!(balance(&f.accounts), 0);
    }

    struct FailingForwarder;

    impl IntermediateResultsForwarder for FailingForwarder {
        fn add_intermediate_transactions(
            &self,
            _txs: Vec<ResultTransaction>,
        ) -> Result<(), HostError> {
            Err(HostError::internal("forwarder closed"))
        }
    }

    #[test]
    fn test_forwarder_failure_reverts_state() {
        let mut f = fixture(false, true, None);
        f.processor.results_forwarder = Arc::new(FailingForwarder);
        let scr = transfer_scr(None);

        let err = f.processor.process_smart_contract_result(Some(&scr)).unwrap_err();
        assert!(matches!(err, ProcessError::Host(_)));
        assert_eq!(balance(&f.accounts), 0);
        let hash = calculate_hash(&Blake3Hasher, &scr);
        assert!(f.outputs.get(&hash).is_none());
    }

    #[test]
    fn test_return_call_after_error_finishes() {
        let f = fixture(true, false, None);
        let mut scr = transfer_scr(None);
        scr.return_message = b"callee failed".to_vec();
        let code = f.processor.process_smart_contract_result(Some(&scr)).unwrap();
        assert_eq!(code, ReturnCode::Ok);
    }
}
