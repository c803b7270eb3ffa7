//! Token transfer built-ins and their argument layouts.
//!
//! - `ESDTTransfer@token@value[@function@args...]`, sent to the receiver.
//! - `ESDTNFTTransfer@token@nonce@value@destination[@function@args...]`,
//!   sent to the sender itself.
//! - `MultiESDTNFTTransfer[@destination]@count(@token@nonce@value)*[@function@args...]`;
//!   the destination argument is present only when sent to the sender itself.

use causeway_primitives::types::{be_bytes_to_u128, be_bytes_to_u64};
use causeway_primitives::{Address, ChainError, ChainResult, EsdtTransfer, ParsedEsdtTransfers};

pub const BUILT_IN_ESDT_TRANSFER: &str = "ESDTTransfer";
pub const BUILT_IN_ESDT_NFT_TRANSFER: &str = "ESDTNFTTransfer";
pub const BUILT_IN_MULTI_ESDT_NFT_TRANSFER: &str = "MultiESDTNFTTransfer";

const ARGS_PER_TRANSFER: usize = 3;

/// Recognise the token transfers of a transfer built-in call.
pub fn parse_esdt_transfers(
    sender: &Address,
    receiver: &Address,
    function: &str,
    args: &[Vec<u8>],
) -> ChainResult<ParsedEsdtTransfers> {
    match function {
        BUILT_IN_ESDT_TRANSFER => parse_single_esdt_transfer(receiver, args),
        BUILT_IN_ESDT_NFT_TRANSFER => parse_single_nft_transfer(sender, receiver, args),
        BUILT_IN_MULTI_ESDT_NFT_TRANSFER => parse_multi_transfer(sender, receiver, args),
        other => Err(ChainError::InvalidCallData(format!(
            "{other} is not a token transfer"
        ))),
    }
}

/// Returns true for the built-ins handled by [`parse_esdt_transfers`].
pub fn is_esdt_transfer_function(function: &str) -> bool {
    matches!(
        function,
        BUILT_IN_ESDT_TRANSFER | BUILT_IN_ESDT_NFT_TRANSFER | BUILT_IN_MULTI_ESDT_NFT_TRANSFER
    )
}

fn parse_single_esdt_transfer(receiver: &Address, args: &[Vec<u8>]) -> ChainResult<ParsedEsdtTransfers> {
    if args.len() < 2 {
        return Err(too_few_args(BUILT_IN_ESDT_TRANSFER, args.len()));
    }
    let transfer = EsdtTransfer {
        token_identifier: args[0].clone(),
        token_nonce: 0,
        value: value_arg(&args[1])?,
    };
    with_call(*receiver, vec![transfer], &args[2..])
}

fn parse_single_nft_transfer(
    sender: &Address,
    receiver: &Address,
    args: &[Vec<u8>],
) -> ChainResult<ParsedEsdtTransfers> {
    if args.len() < 4 {
        return Err(too_few_args(BUILT_IN_ESDT_NFT_TRANSFER, args.len()));
    }
    if sender != receiver {
        return Err(ChainError::InvalidCallData(
            "ESDTNFTTransfer must be sent to self".into(),
        ));
    }
    let transfer = EsdtTransfer {
        token_identifier: args[0].clone(),
        token_nonce: nonce_arg(&args[1])?,
        value: value_arg(&args[2])?,
    };
    with_call(address_arg(&args[3])?, vec![transfer], &args[4..])
}

fn parse_multi_transfer(
    sender: &Address,
    receiver: &Address,
    args: &[Vec<u8>],
) -> ChainResult<ParsedEsdtTransfers> {
    let (destination, rest) = if sender == receiver {
        let (first, rest) = args
            .split_first()
            .ok_or_else(|| too_few_args(BUILT_IN_MULTI_ESDT_NFT_TRANSFER, 0))?;
        (address_arg(first)?, rest)
    } else {
        (*receiver, args)
    };

    let (count, rest) = rest
        .split_first()
        .ok_or_else(|| too_few_args(BUILT_IN_MULTI_ESDT_NFT_TRANSFER, args.len()))?;
    let count = be_bytes_to_u64(count)
        .ok_or_else(|| ChainError::InvalidCallData("transfer count overflows".into()))?
        as usize;
    if count == 0 {
        return Err(ChainError::InvalidCallData("zero token transfers".into()));
    }
    let needed = count.saturating_mul(ARGS_PER_TRANSFER);
    if rest.len() < needed {
        return Err(too_few_args(BUILT_IN_MULTI_ESDT_NFT_TRANSFER, args.len()));
    }

    let transfers = rest[..needed]
        .chunks(ARGS_PER_TRANSFER)
        .map(|chunk| {
            Ok(EsdtTransfer {
                token_identifier: chunk[0].clone(),
                token_nonce: nonce_arg(&chunk[1])?,
                value: value_arg(&chunk[2])?,
            })
        })
        .collect::<ChainResult<Vec<_>>>()?;

    with_call(destination, transfers, &rest[needed..])
}

fn with_call(
    receiver: Address,
    esdt_transfers: Vec<EsdtTransfer>,
    call: &[Vec<u8>],
) -> ChainResult<ParsedEsdtTransfers> {
    let (call_function, call_args) = match call.split_first() {
        Some((function, args)) => (
            String::from_utf8(function.clone())
                .map_err(|_| ChainError::InvalidCallData("call function is not utf-8".into()))?,
            args.to_vec(),
        ),
        None => (String::new(), Vec::new()),
    };
    Ok(ParsedEsdtTransfers {
        esdt_transfers,
        receiver,
        call_function,
        call_args,
    })
}

fn value_arg(arg: &[u8]) -> ChainResult<u128> {
    be_bytes_to_u128(arg).ok_or_else(|| ChainError::InvalidCallData("token value overflows".into()))
}

fn nonce_arg(arg: &[u8]) -> ChainResult<u64> {
    be_bytes_to_u64(arg).ok_or_else(|| ChainError::InvalidCallData("token nonce overflows".into()))
}

fn address_arg(arg: &[u8]) -> ChainResult<Address> {
    arg.try_into()
        .map_err(|_| ChainError::InvalidCallData(format!("destination has {} bytes", arg.len())))
}

fn too_few_args(function: &str, got: usize) -> ChainError {
    ChainError::InvalidCallData(format!("{function}: too few arguments ({got})"))
}
