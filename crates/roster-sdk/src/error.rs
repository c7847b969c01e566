//! Error types for the roster

use roster_client::StoreError;
use thiserror::Error;

/// Result type for roster operations
pub type Result<T> = std::result::Result<T, RosterError>;

/// Roster error types
#[derive(Error, Debug)]
pub enum RosterError {
    /// Password and confirmation differ
    #[error("Passwords do not match")]
    SecretMismatch,

    /// Row has never been saved, so there is nothing remote to act on
    #[error("User at index {index} is not registered in the store")]
    NotPersisted { index: usize },

    /// No row at this position
    #[error("Index {index} out of range for roster of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// The row being edited left the roster
    #[error("The user being edited is no longer in the roster")]
    EditTargetGone,

    /// Remote store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RosterError {
    /// Raised before any remote call was made
    pub fn is_local(&self) -> bool {
        !matches!(self, RosterError::Store(_))
    }
}
