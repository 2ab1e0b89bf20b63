//! Dispatch error types.

use thiserror::Error;

/// Errors that fail a bulk run wholesale. Individual recipient failures
/// are reported through [`crate::BulkResult`], never through this type.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Missing sender address or provider credentials; reported before
    /// any send is attempted.
    #[error("Dispatch configuration error: {0}")]
    Configuration(&'static str),

    /// Transport-level hard fault (also configuration in nature).
    #[error("Transport fault: {0}")]
    Transport(#[from] broadside_transport::TransportError),

    /// Log store failure outside the per-recipient path.
    #[error("Store error: {0}")]
    Store(#[from] broadside_store::StoreError),

    /// The job queue rejected a submission.
    #[error("Job queue is full")]
    QueueFull,
}
