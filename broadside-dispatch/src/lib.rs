//! Bulk delivery engine.
//!
//! This crate provides functionality to:
//! - Partition a campaign's recipient list into fixed-size batches
//! - Bound concurrent in-flight provider calls with a semaphore
//! - Pace aggregate message issuance below a configured ceiling
//! - Pre-write and finalize one delivery log record per recipient
//! - Run bulk sends from a job queue drained by a worker pool

mod cancel;
mod dispatcher;
mod error;
mod pacing;
mod types;
mod worker;

pub use cancel::CancelToken;
pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use pacing::RatePacer;
pub use types::{BulkResult, CampaignPayload, RecipientMessage, RecipientOutcome};
pub use worker::{JobQueue, JobState, JobStatus};
