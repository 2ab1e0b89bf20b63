//! Delivery status vocabulary shared by the dispatcher, store, and
//! engagement pipeline.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a single per-recipient delivery.
///
/// `Pending` is written before the provider call is issued; the dispatcher
/// finalizes it to `Sent` or `Failed`. The remaining states are applied by
/// the webhook ingestor as the provider reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
    Delivered,
    Bounced,
    #[serde(rename = "spamreport")]
    SpamReported,
}

impl DeliveryStatus {
    /// Statuses counted as successfully delivered by the aggregation
    /// queries.
    #[must_use]
    pub const fn is_delivered_equivalent(self) -> bool {
        matches!(self, Self::Sent | Self::Delivered)
    }

    /// Statuses counted as failed deliveries by the aggregation queries.
    #[must_use]
    pub const fn is_failure_equivalent(self) -> bool {
        matches!(self, Self::Failed | Self::Bounced)
    }

    /// Stable lowercase label, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Delivered => "delivered",
            Self::Bounced => "bounced",
            Self::SpamReported => "spamreport",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provider-call attempt for a single recipient.
///
/// `status_code` is `None` when the attempt never got a response
/// (connection failure, timeout).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendAttempt {
    pub attempt: u32,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

impl SendAttempt {
    #[must_use]
    pub const fn responded(attempt: u32, status_code: u16) -> Self {
        Self {
            attempt,
            status_code: Some(status_code),
            error: None,
        }
    }

    #[must_use]
    pub fn errored(attempt: u32, error: String) -> Self {
        Self {
            attempt,
            status_code: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&DeliveryStatus::SpamReported).unwrap();
        assert_eq!(json, "\"spamreport\"");
        let back: DeliveryStatus = serde_json::from_str("\"bounced\"").unwrap();
        assert_eq!(back, DeliveryStatus::Bounced);
    }

    #[test]
    fn delivered_and_failure_sets() {
        assert!(DeliveryStatus::Sent.is_delivered_equivalent());
        assert!(DeliveryStatus::Delivered.is_delivered_equivalent());
        assert!(!DeliveryStatus::Bounced.is_delivered_equivalent());

        assert!(DeliveryStatus::Failed.is_failure_equivalent());
        assert!(DeliveryStatus::Bounced.is_failure_equivalent());
        assert!(!DeliveryStatus::SpamReported.is_failure_equivalent());
        assert!(!DeliveryStatus::Pending.is_failure_equivalent());
    }
}
