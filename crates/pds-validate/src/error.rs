//! Error types for validation and registry access.

use std::path::PathBuf;

use pds_codec::CodecError;
use thiserror::Error;

/// Fatal validation failures.
///
/// User-correctable problems are never errors; they are reported as
/// [`Issue`](crate::Issue)s inside a [`ScreenResult`](crate::ScreenResult).
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("unknown screen '{id}'")]
    UnknownScreen { id: String },

    #[error("lot {lot} does not exist (the record has {count} lots)")]
    LotOutOfRange { lot: usize, count: usize },

    /// The address space implies incompatible shapes.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl ValidationError {
    /// Message suitable for end users.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownScreen { id } => format!(
                "The form has no step named '{id}'. The form configuration may be outdated."
            ),
            Self::LotOutOfRange { lot, count } => {
                format!("Lot {} does not exist; the form has {count} lots.", lot + 1)
            }
            Self::Codec(CodecError::StructuralConflict { address, .. }) => format!(
                "The saved form data is inconsistent at '{address}' and cannot be validated. \
                 Please report this problem."
            ),
            Self::Codec(CodecError::InvalidAddress { address, .. }) => {
                format!("The form configuration refers to an invalid field '{address}'.")
            }
        }
    }
}

/// Registry lookup and loading failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry could not answer for `code`.
    #[error("classification registry unavailable for code '{code}': {reason}")]
    Unavailable { code: String, reason: String },

    #[error("failed to load classification registry {path}")]
    Load {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("classification registry {path} is missing column '{column}'")]
    MissingColumn { path: PathBuf, column: String },
}
