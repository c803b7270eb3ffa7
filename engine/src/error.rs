//! Engine error types.

use causeway_hostapi::HostError;
use causeway_primitives::{ChainError, Round};

/// Top-level error type for the engine crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessError {
    /// A header, or the header inside an incoming header, is missing.
    #[error("nil header")]
    NilHeader,

    /// The header hash is in the blacklist.
    #[error("header is blacklisted")]
    HeaderBlackListed,

    /// The header round lies inside a hardfork exclusion range.
    #[error("excluded header, round {round}")]
    ExcludedHeader { round: Round },

    /// A cross-chain event could not be decoded.
    #[error("invalid incoming event at index {index}: {reason}")]
    InvalidEvent { index: usize, reason: String },

    /// Nothing has been cross-notarized yet for the shard.
    #[error("nil notarized header slice")]
    NilNotarizedHeaderSlice,

    #[error("notarized header offset {offset} is out of bound, {len} headers notarized")]
    NotarizedHeaderOffsetOutOfBound { offset: usize, len: usize },

    #[error("nil smart contract result")]
    NilSmartContractResult,

    /// The receiver does not belong to this shard.
    #[error("nil smart contract destination account")]
    NilSCDestAccount,

    /// The transaction type cannot be handled by this processor.
    #[error("wrong transaction")]
    WrongTransaction,

    #[error("nil vm output")]
    NilVmOutput,

    #[error("wrong type in mini block")]
    WrongTypeInMiniBlock,

    #[error("missing transaction")]
    MissingTransaction,

    #[error("missing mini block header")]
    MissingMiniBlockHeader,

    #[error("max block size reached")]
    MaxBlockSizeReached,

    /// The caller's time budget ran out.
    #[error("time is out")]
    TimeIsOut,

    #[error("max gas limit used for dest me txs is reached")]
    MaxGasLimitUsedForDestMeTxsIsReached,

    /// Collaborator failure.
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// Primitive data handling failure.
    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl ProcessError {
    /// Returns true for errors that end a mini-block regardless of the
    /// execution mode: the time budget and the gas or size ceilings.
    pub fn stops_processing(&self) -> bool {
        matches!(
            self,
            Self::TimeIsOut
                | Self::MaxGasLimitUsedForDestMeTxsIsReached
                | Self::MaxBlockSizeReached
                | Self::Chain(ChainError::MaxGasLimitPerMiniBlockInReceiverShardIsReached { .. })
                | Self::Chain(ChainError::MaxGasLimitPerBlockInSelfShardIsReached { .. })
        )
    }
}

/// Convenience result type for engine operations.
pub type ProcessResult<T> = Result<T, ProcessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ProcessError::ExcludedHeader { round: 42 }.to_string(),
            "excluded header, round 42"
        );
        let err = ProcessError::InvalidEvent {
            index: 3,
            reason: "too few topics".into(),
        };
        assert!(err.to_string().contains("index 3"));
    }

    #[test]
    fn test_stops_processing() {
        assert!(ProcessError::TimeIsOut.stops_processing());
        assert!(ProcessError::MaxGasLimitUsedForDestMeTxsIsReached.stops_processing());
        assert!(ProcessError::Chain(ChainError::MaxGasLimitPerBlockInSelfShardIsReached {
            limit: 1,
            needed: 2
        })
        .stops_processing());
        assert!(!ProcessError::NilSCDestAccount.stops_processing());
        assert!(!ProcessError::Host(HostError::user_error()).stops_processing());
    }

    #[test]
    fn test_from_conversions() {
        let err: ProcessError = HostError::not_found("vm").into();
        assert!(matches!(err, ProcessError::Host(_)));
        let err: ProcessError = ChainError::InvalidCallData("empty".into()).into();
        assert!(matches!(err, ProcessError::Chain(_)));
    }
}
