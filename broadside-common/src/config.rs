//! Configuration tree for the Broadside campaign mailer.
//!
//! Loaded once at process start from a TOML file and handed to the
//! application context; components receive the sections they need and own
//! no process-wide configuration state.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub workers: WorkerConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }
}

/// Email delivery provider credentials and addressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key presented as a bearer token on every send.
    #[serde(default)]
    pub api_key: String,

    /// Provider mail-send endpoint.
    #[serde(default = "defaults::provider_endpoint")]
    pub endpoint: String,

    /// Sender address applied to every outgoing message.
    #[serde(default)]
    pub sender: String,

    /// Optional Reply-To address.
    #[serde(default)]
    pub reply_to: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: defaults::provider_endpoint(),
            sender: String::new(),
            reply_to: None,
        }
    }
}

/// Bulk dispatch bounds. All three limits are configuration, not emergent
/// behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Recipients per batch.
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    /// Maximum simultaneous in-flight provider calls.
    #[serde(default = "defaults::concurrency")]
    pub concurrency: usize,

    /// Aggregate message-issuance ceiling.
    #[serde(default = "defaults::messages_per_second")]
    pub messages_per_second: f64,

    /// Pause between batches, in milliseconds.
    #[serde(default = "defaults::batch_pause_ms")]
    pub batch_pause_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::batch_size(),
            concurrency: defaults::concurrency(),
            messages_per_second: defaults::messages_per_second(),
            batch_pause_ms: defaults::batch_pause_ms(),
        }
    }
}

/// Retry schedule for a single provider call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempt ceiling, including the first try.
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential backoff, in seconds.
    #[serde(default = "defaults::base_backoff_secs")]
    pub base_backoff_secs: u64,

    /// Cap applied to the computed backoff, in seconds.
    #[serde(default = "defaults::max_backoff_secs")]
    pub max_backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            base_backoff_secs: defaults::base_backoff_secs(),
            max_backoff_secs: defaults::max_backoff_secs(),
        }
    }
}

/// Tracking-link minting and verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Server secret for click-link HMAC signatures.
    #[serde(default)]
    pub secret: String,

    /// Public base URL embedded into pixel and click URLs.
    #[serde(default = "defaults::public_base_url")]
    pub public_base_url: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            public_base_url: defaults::public_base_url(),
        }
    }
}

/// Inbound webhook authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Provider public key, PEM or base64 DER.
    #[serde(default)]
    pub public_key: Option<String>,

    /// Explicit opt-out for signature verification.
    #[serde(default = "defaults::verify_signatures")]
    pub verify_signatures: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            public_key: None,
            verify_signatures: defaults::verify_signatures(),
        }
    }
}

/// HTTP server binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::listen_address")]
    pub listen_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: defaults::listen_address(),
        }
    }
}

/// Send worker pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of workers draining the job queue.
    #[serde(default = "defaults::worker_count")]
    pub count: usize,

    /// Bounded depth of the job queue.
    #[serde(default = "defaults::queue_depth")]
    pub queue_depth: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: defaults::worker_count(),
            queue_depth: defaults::queue_depth(),
        }
    }
}

mod defaults {
    pub fn provider_endpoint() -> String {
        "https://api.sendgrid.com/v3/mail/send".to_string()
    }

    pub const fn batch_size() -> usize {
        50
    }

    pub const fn concurrency() -> usize {
        8
    }

    pub const fn messages_per_second() -> f64 {
        10.0
    }

    pub const fn batch_pause_ms() -> u64 {
        500
    }

    pub const fn max_attempts() -> u32 {
        4
    }

    pub const fn base_backoff_secs() -> u64 {
        2
    }

    pub const fn max_backoff_secs() -> u64 {
        30
    }

    pub fn public_base_url() -> String {
        "http://localhost:8000".to_string()
    }

    pub const fn verify_signatures() -> bool {
        true
    }

    pub fn listen_address() -> String {
        "[::]:8000".to_string()
    }

    pub const fn worker_count() -> usize {
        2
    }

    pub const fn queue_depth() -> usize {
        64
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_documented_bounds() {
        let config = Config::default();
        assert_eq!(config.dispatch.batch_size, 50);
        assert_eq!(config.dispatch.concurrency, 8);
        assert!((config.dispatch.messages_per_second - 10.0).abs() < f64::EPSILON);
        assert_eq!(config.retry.max_attempts, 4);
        assert!(config.webhook.verify_signatures);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[provider]
api_key = "SG.test"
sender = "news@example.com"

[dispatch]
batch_size = 25
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.provider.api_key, "SG.test");
        assert_eq!(config.provider.sender, "news@example.com");
        assert_eq!(config.dispatch.batch_size, 25);
        // untouched sections keep their defaults
        assert_eq!(config.dispatch.concurrency, 8);
        assert_eq!(config.retry.max_backoff_secs, 30);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = Config::from_file("/nonexistent/broadside.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
