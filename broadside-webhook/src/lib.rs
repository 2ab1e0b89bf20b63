//! Provider webhook ingestion.
//!
//! Inbound engagement batches go through Authenticate → Parse → per-event
//! {resolve campaign → resolve/create log record → apply update}. The
//! whole batch is rejected on an authentication failure; after that, one
//! malformed event never aborts processing of the rest.

mod error;
mod event;
mod ingest;
mod routes;
mod verify;

pub use error::WebhookError;
pub use event::{EventKind, RawEngagementEvent};
pub use ingest::{IngestReport, Verification, WebhookIngestor};
pub use routes::{SIGNATURE_HEADER, TIMESTAMP_HEADER, WebhookState, router};
pub use verify::WebhookVerifier;
