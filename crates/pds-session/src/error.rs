//! Session error types.

use pds_codec::CodecError;
use thiserror::Error;

/// Errors raised by lot and session operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("lot {index} does not exist (the record has {count} lots)")]
    LotOutOfRange { index: usize, count: usize },

    /// Every record keeps at least one lot.
    #[error("cannot remove the last remaining lot")]
    LastLot,

    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
