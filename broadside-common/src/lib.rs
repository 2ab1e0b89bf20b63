//! Shared foundation for the Broadside campaign mailer.
//!
//! This crate holds the pieces every subsystem needs: the configuration
//! tree, canonical identifiers, delivery status vocabulary, and the
//! tracing setup.

pub mod config;
pub mod id;
pub mod logging;
pub mod status;

pub use config::{Config, ConfigError};
pub use id::CampaignId;
pub use status::{DeliveryStatus, SendAttempt};

pub use tracing;

/// Control signal broadcast to long-running components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
}
