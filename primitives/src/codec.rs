//! Canonical serialization for hashed types.
//!
//! Every content hash in Causeway is computed over these bytes, so two
//! nodes handling the same data always agree on its hash.
//!
//! Encoding format:
//! - Fixed-size fields (Hash, Address, u32, u64, u128, i32) are written directly, little-endian
//! - Variable-length fields (`Vec<u8>`, `String`) are length-prefixed (u32 LE)
//! - Repeated fields are count-prefixed (u32 LE) then concatenated
//! - Optional values: 1-byte flag (0=None, 1=Some) followed by the value if Some
//! - Enums are written as their `u8` discriminant

use crate::block::{
    BridgeOperation, ExtendedHeader, Header, HeaderVariant, IncomingEvent, MiniBlock,
    MiniBlockHeader, MiniBlockType,
};
use crate::error::{ChainError, ChainResult};
use crate::state::UserAccount;
use crate::transaction::{CallType, ResultTransaction};
use crate::types::Hash;

/// Types with a canonical byte encoding.
pub trait CanonicalEncode {
    /// Append the canonical encoding of `self` to `buf`.
    fn encode_to(&self, buf: &mut Vec<u8>);

    /// Canonical encoding as a fresh buffer.
    fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128);
        self.encode_to(&mut buf);
        buf
    }
}

/// A cursor for reading bytes during decoding.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn read_bytes(&mut self, n: usize) -> ChainResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| ChainError::Serialization("unexpected end of data".into()))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> ChainResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    fn read_u8(&mut self) -> ChainResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u32(&mut self) -> ChainResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn read_i32(&mut self) -> ChainResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    fn read_u64(&mut self) -> ChainResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    fn read_u128(&mut self) -> ChainResult<u128> {
        Ok(u128::from_le_bytes(self.read_array()?))
    }

    fn read_hash(&mut self) -> ChainResult<Hash> {
        self.read_array()
    }

    fn read_optional_hash(&mut self) -> ChainResult<Option<Hash>> {
        match self.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(self.read_hash()?)),
            _ => Err(ChainError::Serialization("invalid optional flag".into())),
        }
    }

    fn read_var_bytes(&mut self) -> ChainResult<Vec<u8>> {
        let len = self.read_u32()? as usize;
        Ok(self.read_bytes(len)?.to_vec())
    }

    fn read_count(&mut self) -> ChainResult<usize> {
        let count = self.read_u32()? as usize;
        // every element takes at least one byte; reject absurd counts early
        if count > self.data.len().saturating_sub(self.pos) {
            return Err(ChainError::Serialization("count exceeds input".into()));
        }
        Ok(count)
    }
}

// ── Encoding helpers ──

fn write_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_i32(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_u128(buf: &mut Vec<u8>, v: u128) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_hash(buf: &mut Vec<u8>, h: &Hash) {
    buf.extend_from_slice(h);
}

fn write_optional_hash(buf: &mut Vec<u8>, h: &Option<Hash>) {
    match h {
        None => buf.push(0),
        Some(hash) => {
            buf.push(1);
            buf.extend_from_slice(hash);
        }
    }
}

fn write_var_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    write_u32(buf, data.len() as u32);
    buf.extend_from_slice(data);
}

fn write_count(buf: &mut Vec<u8>, n: usize) {
    write_u32(buf, n as u32);
}

// ── ResultTransaction ──

impl CanonicalEncode for ResultTransaction {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        write_u64(buf, self.nonce);
        write_u128(buf, self.value);
        write_hash(buf, &self.receiver);
        write_hash(buf, &self.sender);
        write_var_bytes(buf, &self.data);
        write_optional_hash(buf, &self.prev_tx_hash);
        write_optional_hash(buf, &self.original_tx_hash);
        write_u64(buf, self.gas_limit);
        write_u64(buf, self.gas_price);
        write_u8(buf, self.call_type as u8);
        write_optional_hash(buf, &self.original_sender);
        write_var_bytes(buf, &self.return_message);
    }
}

/// Decode a `ResultTransaction` from its canonical bytes.
pub fn decode_result_transaction(data: &[u8]) -> ChainResult<ResultTransaction> {
    let mut r = Reader::new(data);

    let nonce = r.read_u64()?;
    let value = r.read_u128()?;
    let receiver = r.read_hash()?;
    let sender = r.read_hash()?;
    let payload = r.read_var_bytes()?;
    let prev_tx_hash = r.read_optional_hash()?;
    let original_tx_hash = r.read_optional_hash()?;
    let gas_limit = r.read_u64()?;
    let gas_price = r.read_u64()?;
    let call_type = CallType::from_u8(r.read_u8()?)
        .ok_or_else(|| ChainError::Serialization("invalid call type".into()))?;
    let original_sender = r.read_optional_hash()?;
    let return_message = r.read_var_bytes()?;

    if !r.is_exhausted() {
        return Err(ChainError::Serialization("trailing bytes".into()));
    }

    Ok(ResultTransaction {
        nonce,
        value,
        receiver,
        sender,
        data: payload,
        prev_tx_hash,
        original_tx_hash,
        gas_limit,
        gas_price,
        call_type,
        original_sender,
        return_message,
    })
}

// ── Headers ──

impl CanonicalEncode for MiniBlockHeader {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        write_hash(buf, &self.hash);
        write_u32(buf, self.sender_shard_id);
        write_u32(buf, self.receiver_shard_id);
        write_u32(buf, self.tx_count);
        write_u8(buf, self.kind as u8);
        write_i32(buf, self.index_of_first_tx_processed);
        write_i32(buf, self.index_of_last_tx_processed);
    }
}

impl CanonicalEncode for Header {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        write_u32(buf, self.shard_id);
        write_u64(buf, self.nonce);
        write_u64(buf, self.round);
        write_u32(buf, self.epoch);
        write_u64(buf, self.timestamp);
        write_hash(buf, &self.prev_hash);
        write_var_bytes(buf, &self.prev_rand_seed);
        write_var_bytes(buf, &self.rand_seed);
        write_hash(buf, &self.root_hash);
        write_count(buf, self.mini_block_headers.len());
        for mbh in &self.mini_block_headers {
            mbh.encode_to(buf);
        }
    }
}

/// Decode a `Header` from its canonical bytes.
pub fn decode_header(data: &[u8]) -> ChainResult<Header> {
    let mut r = Reader::new(data);

    let shard_id = r.read_u32()?;
    let nonce = r.read_u64()?;
    let round = r.read_u64()?;
    let epoch = r.read_u32()?;
    let timestamp = r.read_u64()?;
    let prev_hash = r.read_hash()?;
    let prev_rand_seed = r.read_var_bytes()?;
    let rand_seed = r.read_var_bytes()?;
    let root_hash = r.read_hash()?;

    let count = r.read_count()?;
    let mut mini_block_headers = Vec::with_capacity(count);
    for _ in 0..count {
        let hash = r.read_hash()?;
        let sender_shard_id = r.read_u32()?;
        let receiver_shard_id = r.read_u32()?;
        let tx_count = r.read_u32()?;
        let kind = MiniBlockType::from_u8(r.read_u8()?)
            .ok_or_else(|| ChainError::Serialization("invalid mini-block type".into()))?;
        let index_of_first_tx_processed = r.read_i32()?;
        let index_of_last_tx_processed = r.read_i32()?;
        mini_block_headers.push(MiniBlockHeader {
            hash,
            sender_shard_id,
            receiver_shard_id,
            tx_count,
            kind,
            index_of_first_tx_processed,
            index_of_last_tx_processed,
        });
    }

    if !r.is_exhausted() {
        return Err(ChainError::Serialization("trailing bytes".into()));
    }

    Ok(Header {
        shard_id,
        nonce,
        round,
        epoch,
        timestamp,
        prev_hash,
        prev_rand_seed,
        rand_seed,
        root_hash,
        mini_block_headers,
    })
}

impl CanonicalEncode for MiniBlock {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        write_count(buf, self.tx_hashes.len());
        for h in &self.tx_hashes {
            write_hash(buf, h);
        }
        write_u32(buf, self.sender_shard_id);
        write_u32(buf, self.receiver_shard_id);
        write_u8(buf, self.kind as u8);
    }
}

impl CanonicalEncode for IncomingEvent {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        write_var_bytes(buf, &self.identifier);
        write_hash(buf, &self.address);
        write_count(buf, self.topics.len());
        for topic in &self.topics {
            write_var_bytes(buf, topic);
        }
        write_var_bytes(buf, &self.data);
    }
}

impl CanonicalEncode for BridgeOperation {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        write_var_bytes(buf, &self.hash_of_hashes);
        write_var_bytes(buf, &self.hash);
    }
}

impl CanonicalEncode for ExtendedHeader {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.header.encode_to(buf);
        write_count(buf, self.incoming_mini_blocks.len());
        for mb in &self.incoming_mini_blocks {
            mb.encode_to(buf);
        }
        write_count(buf, self.incoming_events.len());
        for event in &self.incoming_events {
            event.encode_to(buf);
        }
        write_count(buf, self.confirmed_bridge_operations.len());
        for op in &self.confirmed_bridge_operations {
            op.encode_to(buf);
        }
    }
}

impl CanonicalEncode for HeaderVariant {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        // a leading tag keeps a plain header and an extended header with no
        // incoming data from colliding
        match self {
            Self::Plain(h) => {
                write_u8(buf, 0);
                h.encode_to(buf);
            }
            Self::Extended(ext) => {
                write_u8(buf, 1);
                ext.encode_to(buf);
            }
        }
    }
}

// ── Accounts ──

impl CanonicalEncode for UserAccount {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        write_hash(buf, &self.address);
        write_u64(buf, self.nonce);
        write_u128(buf, self.balance);
        write_var_bytes(buf, &self.code);
        write_count(buf, self.storage.len());
        for (key, value) in &self.storage {
            write_var_bytes(buf, key);
            write_var_bytes(buf, value);
        }
    }
}
