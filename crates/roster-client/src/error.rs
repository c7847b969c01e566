//! Error types for the store client

use thiserror::Error;

/// Store client error
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned an error
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server rejected the entity (constraint violation)
    #[error("Rejected by server ({status}): {message}")]
    ValidationRejected { status: u16, message: String },

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Operation needs a persisted identifier
    #[error("Entity has no identifier")]
    MissingId,
}

impl StoreError {
    /// Network, HTTP-layer and decoding failures
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            StoreError::Http(_)
                | StoreError::Json(_)
                | StoreError::Server { .. }
                | StoreError::InvalidResponse(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
