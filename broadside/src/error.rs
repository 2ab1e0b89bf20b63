//! Application-level errors.

use thiserror::Error;

/// Startup and serving failures for the main binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] broadside_common::ConfigError),

    #[error("Transport setup failed: {0}")]
    Transport(#[from] broadside_transport::TransportError),

    #[error("Webhook setup failed: {0}")]
    Webhook(#[from] broadside_webhook::WebhookError),

    #[error("Failed to bind listener to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Server(String),
}
