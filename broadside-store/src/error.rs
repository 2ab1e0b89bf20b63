//! Store error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by log and campaign store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record addressed by id no longer exists.
    #[error("Delivery log record not found: {0}")]
    RecordNotFound(String),

    /// Backend-specific failure.
    #[error("Store error: {0}")]
    Internal(String),
}
