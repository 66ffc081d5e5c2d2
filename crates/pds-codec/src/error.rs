//! Codec error types.

use thiserror::Error;

/// Errors raised while converting between nested records and addresses.
///
/// Both variants indicate a caller or schema bug rather than bad user
/// input; validation treats them as fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Two addresses imply incompatible shapes at the same path.
    #[error("structural conflict at '{address}': {existing} already present, {incoming} implied")]
    StructuralConflict {
        address: String,
        existing: &'static str,
        incoming: &'static str,
    },

    /// A string cannot be used as an address, or a record key cannot be
    /// encoded as an address segment.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: &'static str },
}

impl CodecError {
    pub(crate) fn conflict(address: &str, existing: &'static str, incoming: &'static str) -> Self {
        Self::StructuralConflict {
            address: address.to_string(),
            existing,
            incoming,
        }
    }

    pub(crate) fn invalid(address: &str, reason: &'static str) -> Self {
        Self::InvalidAddress {
            address: address.to_string(),
            reason,
        }
    }
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
