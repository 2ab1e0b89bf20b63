//! Bulk send payload and result types.

use serde::{Deserialize, Serialize};

/// One already-personalized recipient message. Name substitution and
/// unsubscribe-link substitution happen upstream; the dispatcher only adds
/// tracking instrumentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientMessage {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Per-recipient subject override; the campaign subject applies
    /// otherwise.
    #[serde(default)]
    pub subject: Option<String>,
    pub html: String,
}

/// A campaign's full bulk-send request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignPayload {
    pub campaign_id: String,
    #[serde(default)]
    pub campaign_name: String,
    pub subject: String,
    /// Sender override; the configured sender applies otherwise.
    #[serde(default)]
    pub from_email: Option<String>,
    #[serde(default)]
    pub reply_to: Option<String>,
    pub messages: Vec<RecipientMessage>,
}

/// Per-recipient outcome of one bulk run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientOutcome {
    pub email: String,
    pub success: bool,
    pub status_code: Option<u16>,
    pub attempts: u32,
    #[serde(default)]
    pub error: Option<String>,
}

/// Aggregated result of one bulk run. `total == sent + failed` always
/// holds; a recipient skipped by cancellation counts as failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResult {
    pub campaign_id: String,
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub batches: usize,
    pub details: Vec<RecipientOutcome>,
}
