//! Tracking link service: signed pixel and click-redirect URLs.
//!
//! At render time this crate mints a pixel URL unique per delivery and a
//! signed redirect URL for every tracked hyperlink, binding a random click
//! identifier to its true destination with an HMAC over
//! `click_id|base64url(destination)`. At request time it verifies those
//! signatures, records the engagement against the owning delivery log
//! record, and completes the user-facing response (image or redirect) even
//! when the identifier no longer resolves.

mod error;
mod links;
mod routes;
mod sign;

pub use error::TrackingError;
pub use links::{InstrumentedHtml, TrackingLinks};
pub use routes::{TrackingState, router};
pub use sign::{client_fingerprint, sign_click, verify_click};
