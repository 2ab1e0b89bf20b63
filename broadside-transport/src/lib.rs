//! Transport client for the external email-delivery provider.
//!
//! One message per call. The client owns the retry/backoff policy for that
//! single call: provider 2xx responses are accepted, 429/5xx and network
//! errors are retried with capped exponential backoff (honoring a
//! `Retry-After` hint), and any other 4xx fails immediately. Provider-side
//! failures never raise; only configuration faults do.

mod client;
mod message;
mod retry;

pub use client::{Disposition, HttpTransport, SendOutcome, Transport, TransportError};
pub use message::OutboundMessage;
pub use retry::RetrySchedule;
