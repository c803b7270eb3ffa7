//! Shared helpers for the engine integration tests.
//!
//! Provides a fully wired in-memory node, a token built-in hook and a
//! recording VM, plus builders for incoming headers, deposit events and
//! tracker headers.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use causeway_engine::config::EngineConfig;
use causeway_engine::incoming::events::EVENT_ID_DEPOSIT;
use causeway_engine::preprocess::ProcessedMiniBlocksTracker;
use causeway_engine::smart_contract::tx_type::is_smart_contract_address;
use causeway_engine::smart_contract::{ScProcessorArgs, TxTypeHandler};
use causeway_engine::{
    CacheableAccounts, ChainTracker, IncomingHeaderProcessor, IncomingScrPreprocessor,
    ScrPreprocessorArgs, SovereignScProcessor,
};
use causeway_hostapi::{
    AccountsAdapter, BlockSizeThrottle, BlockchainHook, EpochFlags, FeeSettings, GasComputation,
    HeadersPool, HostError, MemAccounts, MemHeadersPool, MemOutgoingOperations,
    MemResultsForwarder, MemStore, MemTxLogs, MemTxPool, MemVmOutputCache, MemWhitelist,
    VmContainer, VmExecutor,
};
use causeway_primitives::{
    Address, Blake3Hasher, ContractCallInput, ExtendedHeader, Hash, Header, HeaderVariant,
    IncomingEvent, IncomingHeader, MiniBlock, MiniBlockType, Nonce, OutputAccount, OutputTransfer,
    ReturnCode, Round, SovereignShardCoordinator, VmOutput, MAIN_CHAIN_SHARD_ID,
    SOVEREIGN_CHAIN_SHARD_ID,
};

/// Token the built-in hook refuses to move.
pub const FROZEN_TOKEN: &[u8] = b"FROZEN";

/// Function name the recording VM rejects.
pub const REJECTED_CALL: &str = "reject";

/// Storage key where the recording VM writes the last called function.
pub const LAST_CALL_KEY: &[u8] = b"last_call";

/// Gas limit carried by every deposit built here.
pub const DEPOSIT_GAS_LIMIT: u8 = 100;

/// A plain user address.
pub fn user(byte: u8) -> Address {
    [byte; 32]
}

/// A smart contract address: eight leading zero bytes.
pub fn contract(byte: u8) -> Address {
    let mut address = [byte; 32];
    address[..8].fill(0);
    address
}

// ── Collaborators ──

/// Token built-ins over the account state: credits the recipient with
/// the transferred value, then refuses frozen tokens. Transfers to a
/// contract that name a function leave one output transfer behind so the
/// processor runs the post-transfer call.
pub struct EsdtBuiltIns {
    accounts: Arc<dyn AccountsAdapter>,
    calls: AtomicUsize,
}

impl EsdtBuiltIns {
    pub fn new(accounts: Arc<dyn AccountsAdapter>) -> Self {
        Self {
            accounts,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BlockchainHook for EsdtBuiltIns {
    fn process_built_in_function(&self, input: &ContractCallInput) -> Result<VmOutput, HostError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut account = self.accounts.load_account(&input.recipient)?;
        let credited: u128 = input.esdt_transfers.iter().map(|t| t.value).sum();
        account.balance += credited;
        self.accounts.save_account(account)?;

        if input
            .esdt_transfers
            .iter()
            .any(|t| t.token_identifier == FROZEN_TOKEN)
        {
            return Ok(VmOutput::with_code(ReturnCode::UserError, "token is frozen"));
        }

        let mut output = VmOutput::default();
        // arguments: count, (token, nonce, value)*, function, args...
        let call_index = 1 + 3 * input.esdt_transfers.len();
        let has_call = input
            .arguments
            .get(call_index)
            .is_some_and(|function| !function.is_empty());
        if has_call && is_smart_contract_address(&input.recipient) {
            output.output_accounts.insert(
                input.recipient,
                OutputAccount {
                    address: input.recipient,
                    output_transfers: vec![OutputTransfer {
                        gas_limit: input.gas_provided,
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            );
        }
        Ok(output)
    }

    fn reset_counters(&self) {}

    fn get_counter_values(&self) -> BTreeMap<String, u64> {
        BTreeMap::new()
    }
}

/// VM storing the name of every function it runs under [`LAST_CALL_KEY`].
#[derive(Default)]
pub struct RecordingVm {
    calls: AtomicUsize,
}

impl RecordingVm {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VmExecutor for RecordingVm {
    fn run_smart_contract_call(
        &self,
        input: &ContractCallInput,
    ) -> Result<Option<VmOutput>, HostError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if input.function == REJECTED_CALL {
            return Ok(Some(VmOutput::with_code(ReturnCode::UserError, "rejected")));
        }

        let mut output = VmOutput {
            gas_remaining: input.gas_provided / 2,
            ..Default::default()
        };
        output.output_accounts.insert(
            input.recipient,
            OutputAccount {
                address: input.recipient,
                storage_updates: BTreeMap::from([(
                    LAST_CALL_KEY.to_vec(),
                    input.function.as_bytes().to_vec(),
                )]),
                ..Default::default()
            },
        );
        Ok(Some(output))
    }
}

/// Serves [`RecordingVm`] for contract addresses only.
pub struct ContractVms {
    vm: Arc<RecordingVm>,
}

impl VmContainer for ContractVms {
    fn find_vm_by_address(&self, address: &Address) -> Result<Arc<dyn VmExecutor>, HostError> {
        if !is_smart_contract_address(address) {
            return Err(HostError::vm_not_found(hex::encode(address)));
        }
        let vm: Arc<dyn VmExecutor> = self.vm.clone();
        Ok(vm)
    }
}

// ── Node ──

/// Every engine component wired over in-memory collaborators.
pub struct Node {
    pub headers: Arc<MemHeadersPool>,
    pub txs: Arc<MemTxPool>,
    pub outgoing: Arc<MemOutgoingOperations>,
    pub whitelist: Arc<MemWhitelist>,
    pub tracker: Arc<ChainTracker>,
    pub incoming: IncomingHeaderProcessor,
    pub trie: Arc<MemAccounts>,
    pub accounts: Arc<CacheableAccounts>,
    pub hook: Arc<EsdtBuiltIns>,
    pub vm: Arc<RecordingVm>,
    pub logs: Arc<MemTxLogs>,
    pub outputs: Arc<MemVmOutputCache>,
    pub forwarder: Arc<MemResultsForwarder>,
    pub sc_processor: Arc<SovereignScProcessor>,
    pub gas: Arc<GasComputation>,
    pub block_size: Arc<BlockSizeThrottle>,
    pub store: Arc<MemStore>,
    pub processed_mini_blocks: Arc<ProcessedMiniBlocksTracker>,
    pub preprocessor: IncomingScrPreprocessor,
}

impl Node {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default(), FeeSettings::default())
    }

    pub fn with_config(config: &EngineConfig, fees: FeeSettings) -> Self {
        causeway_engine::logging::init_for_tests();

        let headers = Arc::new(MemHeadersPool::new());
        let txs = Arc::new(MemTxPool::new());
        let outgoing = Arc::new(MemOutgoingOperations::new());
        let whitelist = Arc::new(MemWhitelist::new());

        let tracker = Arc::new(ChainTracker::new(
            config.self_shard_id,
            &config.tracker,
            whitelist.clone(),
        ));
        tracker.register_on_pool(headers.as_ref());

        let incoming = IncomingHeaderProcessor::new(
            &config.incoming,
            headers.clone(),
            txs.clone(),
            outgoing.clone(),
            Arc::new(Blake3Hasher),
        );

        let trie = Arc::new(MemAccounts::new());
        let accounts = Arc::new(CacheableAccounts::new(trie.clone()));
        let hook = Arc::new(EsdtBuiltIns::new(accounts.clone()));
        let vm = Arc::new(RecordingVm::default());
        let logs = Arc::new(MemTxLogs::new());
        let outputs = Arc::new(MemVmOutputCache::new());
        let forwarder = Arc::new(MemResultsForwarder::new());

        let sc_processor = Arc::new(SovereignScProcessor::new(ScProcessorArgs {
            accounts: accounts.clone(),
            shard_coordinator: Arc::new(SovereignShardCoordinator),
            blockchain_hook: hook.clone(),
            vm_container: Arc::new(ContractVms { vm: vm.clone() }),
            tx_logs: logs.clone(),
            vm_outputs: outputs.clone(),
            results_forwarder: forwarder.clone(),
            hasher: Arc::new(Blake3Hasher),
            tx_type_handler: TxTypeHandler::default(),
            vm_change_lock: Arc::default(),
            execute_duration_alarm_threshold: config.processing.execute_duration_alarm_threshold(),
        }));

        let gas = Arc::new(GasComputation::new());
        let block_size = Arc::new(BlockSizeThrottle::default());
        let store = Arc::new(MemStore::new());
        let processed_mini_blocks = Arc::new(ProcessedMiniBlocksTracker::new());
        let preprocessor = IncomingScrPreprocessor::new(ScrPreprocessorArgs {
            scr_pool: txs.clone(),
            storer: store.clone(),
            sc_processor: sc_processor.clone(),
            accounts: accounts.clone(),
            gas_handler: gas.clone(),
            economics_fee: Arc::new(fees),
            enable_epochs: Arc::new(EpochFlags::new(true, false)),
            block_size: block_size.clone(),
            shard_coordinator: Arc::new(SovereignShardCoordinator),
            hasher: Arc::new(Blake3Hasher),
            processed_mini_blocks: processed_mini_blocks.clone(),
            max_gas_limit_percent_used_for_dest_me_txs: config
                .processing
                .max_gas_limit_percent_used_for_dest_me_txs,
        });

        Self {
            headers,
            txs,
            outgoing,
            whitelist,
            tracker,
            incoming,
            trie,
            accounts,
            hook,
            vm,
            logs,
            outputs,
            forwarder,
            sc_processor,
            gas,
            block_size,
            store,
            processed_mini_blocks,
            preprocessor,
        }
    }

    /// The extended header stored in the headers pool for `nonce`.
    pub fn extended_in_pool(&self, nonce: Nonce) -> (Hash, ExtendedHeader) {
        let hashes = self.headers.hashes_by_nonce(nonce);
        assert_eq!(hashes.len(), 1, "expected one header at nonce {nonce}");
        let header = self.headers.get_header(&hashes[0]).unwrap();
        (hashes[0], header.as_extended().unwrap().clone())
    }

    pub fn balance(&self, address: &Address) -> u128 {
        self.accounts.load_account(address).unwrap().balance
    }
}

/// A `have_time` budget that never runs out.
pub fn always() -> impl Fn() -> bool {
    || true
}

/// Default timeout for background threads in tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

// ── Incoming headers ──

/// A deposit of `value` units of `token` to `receiver`, with an optional
/// call after the transfer.
///
/// `nonce` is written as a raw byte in the `@`-separated data, so it must
/// not be `b'@'`.
pub fn deposit_event(receiver: Address, token: &[u8], value: u8, nonce: u8, call: Option<&str>) -> IncomingEvent {
    assert_ne!(nonce, b'@');
    let mut data = vec![b'@', nonce, b'@', DEPOSIT_GAS_LIMIT, b'@'];
    if let Some(function) = call {
        data.extend_from_slice(hex::encode(function).as_bytes());
    }
    IncomingEvent {
        identifier: EVENT_ID_DEPOSIT.to_vec(),
        topics: vec![receiver.to_vec(), token.to_vec(), vec![], vec![value]],
        data,
        ..Default::default()
    }
}

/// A main-chain header at `nonce` and `round` carrying `events`.
pub fn incoming_header(nonce: Nonce, round: Round, events: Vec<IncomingEvent>) -> IncomingHeader {
    IncomingHeader {
        header: Some(Header {
            shard_id: MAIN_CHAIN_SHARD_ID,
            nonce,
            round,
            prev_rand_seed: vec![nonce.wrapping_sub(1) as u8],
            rand_seed: vec![nonce as u8],
            ..Default::default()
        }),
        events,
    }
}

/// Main-chain hash used when delivering the header at `nonce`.
pub fn main_chain_hash(nonce: Nonce) -> Hash {
    let mut hash = [0xaa; 32];
    hash[24..].copy_from_slice(&nonce.to_be_bytes());
    hash
}

// ── Tracker headers ──

/// An extended header linked to `prev_hash`, with one incoming
/// transaction `[tx; 32]`. Rand seeds are `[nonce - 1]` and `[nonce]`.
pub fn extended(nonce: Nonce, prev_hash: Hash, tx: u8) -> ExtendedHeader {
    ExtendedHeader {
        header: Header {
            shard_id: SOVEREIGN_CHAIN_SHARD_ID,
            nonce,
            round: nonce,
            prev_hash,
            prev_rand_seed: vec![nonce.wrapping_sub(1) as u8],
            rand_seed: vec![nonce as u8],
            ..Default::default()
        },
        incoming_mini_blocks: vec![MiniBlock {
            tx_hashes: vec![[tx; 32]],
            sender_shard_id: MAIN_CHAIN_SHARD_ID,
            receiver_shard_id: SOVEREIGN_CHAIN_SHARD_ID,
            kind: MiniBlockType::SmartContractResultBlock,
        }],
        ..Default::default()
    }
}

/// A notarized extended header at `nonce`, chainable by [`extended`].
pub fn notarized(nonce: Nonce) -> HeaderVariant {
    HeaderVariant::Extended(ExtendedHeader {
        header: Header {
            nonce,
            round: nonce,
            rand_seed: vec![nonce as u8],
            ..Default::default()
        },
        ..Default::default()
    })
}

/// Hash identifying the tracker header at `nonce` on fork `fork`.
pub fn header_hash(nonce: Nonce, fork: u8) -> Hash {
    let mut hash = [fork; 32];
    hash[24..].copy_from_slice(&nonce.to_be_bytes());
    hash
}
