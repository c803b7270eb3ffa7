//! Mini-block execution tests against the real result processor: full and
//! partial modes, resumption, rollback and the gas and time limits.

mod common;

use std::cell::Cell;

use causeway_engine::config::EngineConfig;
use causeway_engine::preprocess::ProcessedMiniBlockInfo;
use causeway_engine::ProcessError;
use causeway_hostapi::{
    AccountsAdapter, ExecutionInfoCounter, FeeSettings, GasHandler, TransactionPool,
};
use causeway_primitives::{
    calculate_hash, Blake3Hasher, Body, ChainError, Hash, Header, MiniBlock, MiniBlockHeader,
    MiniBlockType, Nonce, ResultTransaction, TxVariant, MAIN_CHAIN_SHARD_ID,
    SOVEREIGN_CHAIN_SHARD_ID,
};

use common::*;

/// Deliver one deposit per `(receiver, value)` and return the hashes of
/// the created result transactions.
fn ingest(node: &Node, nonce: Nonce, deposits: &[(u8, u8)]) -> Vec<Hash> {
    let events = deposits
        .iter()
        .map(|(receiver, value)| deposit_event(user(*receiver), b"TKN", *value, *receiver, None))
        .collect();
    node.incoming
        .add_header(&main_chain_hash(nonce), &incoming_header(nonce, nonce, events))
        .unwrap();
    let (_, extended) = node.extended_in_pool(nonce);
    extended.incoming_tx_hashes()
}

/// A result transaction the processor refuses: not a built-in call.
fn add_wrong_scr(node: &Node) -> Hash {
    let scr = ResultTransaction {
        receiver: user(9),
        data: b"claim".to_vec(),
        ..Default::default()
    };
    let hash = calculate_hash(&Blake3Hasher, &scr);
    let size = scr.size();
    node.txs
        .add_data(hash, TxVariant::Result(scr), size, "wrong")
        .unwrap();
    hash
}

fn mini_block(tx_hashes: Vec<Hash>) -> MiniBlock {
    MiniBlock {
        tx_hashes,
        sender_shard_id: MAIN_CHAIN_SHARD_ID,
        receiver_shard_id: SOVEREIGN_CHAIN_SHARD_ID,
        kind: MiniBlockType::SmartContractResultBlock,
    }
}

#[test]
fn test_full_mode_stops_and_asks_for_revert() {
    let node = Node::new();
    let deposits = ingest(&node, 1, &[(3, 10), (4, 20)]);
    let wrong = add_wrong_scr(&node);
    let mb = mini_block(vec![deposits[0], wrong, deposits[1]]);

    let snapshot = node.accounts.journal_len();
    let exec_info = ExecutionInfoCounter::new();
    let outcome = node
        .preprocessor
        .process_mini_block(&mb, &always(), false, -1, &exec_info)
        .unwrap();

    assert!(outcome.should_revert);
    assert_eq!(outcome.error, Some(ProcessError::WrongTransaction));
    assert_eq!(outcome.processed_tx_hashes, vec![deposits[0]]);
    assert_eq!(outcome.index_of_last_tx_processed, 0);
    assert_eq!(exec_info.started(), vec![deposits[0], wrong]);
    assert_eq!(exec_info.reverted(), vec![wrong]);
    assert_eq!(node.gas.gas_provided(&wrong), 0);
    assert_eq!(node.gas.gas_provided(&deposits[0]), u64::from(DEPOSIT_GAS_LIMIT));

    // nothing is recorded for the block; the caller reverts the rest
    assert!(node.preprocessor.processed_txs().is_empty());
    assert_eq!(node.block_size.num_mini_blocks(), 0);
    assert_eq!(node.balance(&user(3)), 10);
    node.accounts.revert_to_snapshot(snapshot).unwrap();
    assert_eq!(node.balance(&user(3)), 0);
    assert_eq!(node.balance(&user(4)), 0);
}

#[test]
fn test_partial_mode_continues_past_failure() {
    let node = Node::new();
    let deposits = ingest(&node, 1, &[(3, 10), (4, 20)]);
    let wrong = add_wrong_scr(&node);
    let mb = mini_block(vec![deposits[0], wrong, deposits[1]]);

    let exec_info = ExecutionInfoCounter::new();
    let outcome = node
        .preprocessor
        .process_mini_block(&mb, &always(), true, -1, &exec_info)
        .unwrap();

    assert!(!outcome.should_revert);
    assert_eq!(outcome.error, Some(ProcessError::WrongTransaction));
    assert_eq!(outcome.processed_tx_hashes, deposits);
    assert_eq!(outcome.index_of_last_tx_processed, 2);
    assert_eq!(exec_info.reverted(), vec![wrong]);

    assert_eq!(node.balance(&user(3)), 10);
    assert_eq!(node.balance(&user(4)), 20);

    let mut recorded = vec![deposits[0], deposits[1], wrong];
    recorded.sort_unstable();
    assert_eq!(node.preprocessor.processed_txs(), recorded);
    assert_eq!(node.block_size.num_mini_blocks(), 1);
    assert_eq!(node.block_size.num_txs(), 3);
}

#[test]
fn test_resume_after_last_processed_index() {
    let node = Node::new();
    let deposits = ingest(&node, 1, &[(3, 10), (4, 20), (5, 30)]);
    let mb = mini_block(deposits.clone());

    let outcome = node
        .preprocessor
        .process_mini_block(&mb, &always(), true, 0, &ExecutionInfoCounter::new())
        .unwrap();
    assert_eq!(outcome.processed_tx_hashes, deposits[1..].to_vec());
    assert_eq!(outcome.index_of_last_tx_processed, 2);
    assert_eq!(node.balance(&user(3)), 0);
    assert_eq!(node.balance(&user(4)), 20);
    assert_eq!(node.balance(&user(5)), 30);

    // nothing is left after the last index
    let err = node
        .preprocessor
        .process_mini_block(&mb, &always(), true, 2, &ExecutionInfoCounter::new())
        .unwrap_err();
    assert_eq!(
        err,
        ProcessError::Chain(ChainError::IndexOutOfBound {
            first: 3,
            last: 2,
            max_index: 3
        })
    );
}

#[test]
fn test_time_out_stops_partial_mode() {
    let node = Node::new();
    let deposits = ingest(&node, 1, &[(3, 10), (4, 20), (5, 30)]);
    let mb = mini_block(deposits.clone());

    // three checks while loading, then one per transaction
    let budget = Cell::new(4u32);
    let have_time = || {
        let left = budget.get();
        budget.set(left.saturating_sub(1));
        left > 0
    };
    let outcome = node
        .preprocessor
        .process_mini_block(&mb, &have_time, true, -1, &ExecutionInfoCounter::new())
        .unwrap();

    assert_eq!(outcome.error, Some(ProcessError::TimeIsOut));
    assert_eq!(outcome.processed_tx_hashes, vec![deposits[0]]);
    assert_eq!(outcome.index_of_last_tx_processed, 0);
    assert_eq!(node.balance(&user(4)), 0);
}

#[test]
fn test_block_gas_limit_stops_execution() {
    let node = Node::with_config(&EngineConfig::default(), FeeSettings::from_limits(250, 10_000));
    let deposits = ingest(&node, 1, &[(3, 10), (4, 20), (5, 30)]);
    let mb = mini_block(deposits.clone());

    let outcome = node
        .preprocessor
        .process_mini_block(&mb, &always(), true, -1, &ExecutionInfoCounter::new())
        .unwrap();
    assert_eq!(
        outcome.error,
        Some(ProcessError::Chain(
            ChainError::MaxGasLimitPerBlockInSelfShardIsReached {
                limit: 250,
                needed: 300
            }
        ))
    );
    assert_eq!(outcome.processed_tx_hashes, deposits[..2].to_vec());
    assert_eq!(node.balance(&user(5)), 0);
    assert_eq!(node.preprocessor.total_gas_consumed(), 200);
}

#[test]
fn test_dest_me_cap_applies_after_first_mini_block() {
    let node = Node::with_config(&EngineConfig::default(), FeeSettings::from_limits(1_000, 10_000));
    let first = ingest(&node, 1, &[(3, 10), (4, 20), (5, 30)]);
    let second = ingest(&node, 2, &[(6, 1), (7, 2), (8, 3)]);

    // the first mini-block may use the whole block
    let outcome = node
        .preprocessor
        .process_mini_block(&mini_block(first), &always(), true, -1, &ExecutionInfoCounter::new())
        .unwrap();
    assert!(outcome.error.is_none());
    assert_eq!(node.preprocessor.total_gas_consumed(), 300);

    // later ones stop at half of it
    let outcome = node
        .preprocessor
        .process_mini_block(
            &mini_block(second.clone()),
            &always(),
            true,
            -1,
            &ExecutionInfoCounter::new(),
        )
        .unwrap();
    assert_eq!(
        outcome.error,
        Some(ProcessError::MaxGasLimitUsedForDestMeTxsIsReached)
    );
    assert_eq!(outcome.processed_tx_hashes, second[..2].to_vec());
    assert_eq!(node.balance(&user(8)), 0);
}

#[test]
fn test_validation_resumes_from_tracked_progress() {
    let node = Node::new();
    let deposits = ingest(&node, 1, &[(3, 10), (4, 20), (5, 30)]);
    let mb = mini_block(deposits);
    let mb_hash = calculate_hash(&Blake3Hasher, &mb);

    // a previous block executed the first transaction
    node.processed_mini_blocks.set_processed_mini_block_info(
        mb_hash,
        ProcessedMiniBlockInfo {
            fully_processed: false,
            index_of_last_tx_processed: 0,
        },
    );
    let header = Header {
        mini_block_headers: vec![MiniBlockHeader {
            hash: mb_hash,
            tx_count: 3,
            kind: MiniBlockType::SmartContractResultBlock,
            index_of_first_tx_processed: 1,
            index_of_last_tx_processed: 2,
            ..Default::default()
        }],
        ..Default::default()
    };
    let body = Body {
        mini_blocks: vec![mb],
    };

    assert_eq!(node.preprocessor.request_block_transactions(&body), 0);
    node.preprocessor
        .process_block_transactions(&header, &body, &always())
        .unwrap();
    assert_eq!(node.balance(&user(3)), 0);
    assert_eq!(node.balance(&user(4)), 20);
    assert_eq!(node.balance(&user(5)), 30);
}

#[test]
fn test_validation_needs_mini_block_header() {
    let node = Node::new();
    let deposits = ingest(&node, 1, &[(3, 10)]);
    let body = Body {
        mini_blocks: vec![mini_block(deposits)],
    };
    node.preprocessor.request_block_transactions(&body);

    let err = node
        .preprocessor
        .process_block_transactions(&Header::default(), &body, &always())
        .unwrap_err();
    assert_eq!(err, ProcessError::MissingMiniBlockHeader);
}
