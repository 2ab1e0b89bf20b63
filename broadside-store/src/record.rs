//! Delivery log record types.

use std::collections::HashMap;

use broadside_common::{DeliveryStatus, SendAttempt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a delivery log record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Ulid);

impl RecordId {
    /// Generate a new unique record identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Lookup key for the engagement update paths.
///
/// Pixel fetches address a record by tracking token, click redirects by
/// click identifier, and webhook events by (campaign, recipient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKey {
    Token(String),
    Click(String),
    CampaignRecipient { campaign: String, email: String },
}

/// One open event: when it happened and a coarse client fingerprint
/// (absent for webhook-reported opens).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenEvent {
    pub at: DateTime<Utc>,
    pub fingerprint: Option<String>,
}

/// Terminal outcome of one dispatcher send, used to finalize a pending
/// record.
#[derive(Debug, Clone)]
pub struct SendOutcomeRecord {
    pub status: DeliveryStatus,
    pub provider_status: Option<u16>,
    pub attempts: u32,
    pub attempt_history: Vec<SendAttempt>,
    pub body: Option<String>,
    pub error: Option<String>,
}

/// Per-recipient delivery state for one campaign send.
///
/// Created by the dispatcher at send time; mutated only by the webhook
/// ingestor and tracking service afterwards; deleted only by unsubscribe
/// cascade cleanup. `open_count`/`click_count` always equal the length of
/// their event lists: every mutation path goes through [`Self::record_open`]
/// or [`Self::record_click`], which update both together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLogRecord {
    pub id: RecordId,
    pub campaign_id: String,
    pub email: String,
    pub name: Option<String>,
    pub subject: String,
    /// Digest of the final rendered HTML actually handed to the provider.
    pub html_ref: Option<String>,
    pub status: DeliveryStatus,
    pub provider_status: Option<u16>,
    pub attempts: u32,
    pub attempt_history: Vec<SendAttempt>,
    /// Last provider response body, kept for diagnosis; omitted from log
    /// listings.
    pub provider_body: Option<String>,
    pub error: Option<String>,
    pub open_count: u64,
    pub click_count: u64,
    pub open_events: Vec<OpenEvent>,
    pub click_events: Vec<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub bounced_at: Option<DateTime<Utc>>,
    pub spam_reported_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Pixel token minted when the outgoing HTML was rendered.
    pub tracking_token: Option<String>,
    /// Click identifier to true destination, for click-event attribution.
    pub click_map: HashMap<String, String>,
}

impl DeliveryLogRecord {
    /// A record pre-written before the provider call is issued.
    #[must_use]
    pub fn pending(
        campaign_id: impl Into<String>,
        email: impl Into<String>,
        name: Option<String>,
        subject: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::generate(),
            campaign_id: campaign_id.into(),
            email: email.into(),
            name,
            subject: subject.into(),
            html_ref: None,
            status: DeliveryStatus::Pending,
            provider_status: None,
            attempts: 0,
            attempt_history: Vec::new(),
            provider_body: None,
            error: None,
            open_count: 0,
            click_count: 0,
            open_events: Vec::new(),
            click_events: Vec::new(),
            delivered_at: None,
            bounced_at: None,
            spam_reported_at: None,
            created_at: now,
            updated_at: now,
            tracking_token: None,
            click_map: HashMap::new(),
        }
    }

    /// A zero-state record created when a webhook event arrives for a
    /// (campaign, recipient) pair with no send on file.
    #[must_use]
    pub fn zero_state(
        campaign_id: impl Into<String>,
        email: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        let mut record = Self::pending(campaign_id, email, None, String::new());
        record.created_at = at;
        record.updated_at = at;
        record
    }

    /// Apply the terminal outcome of a send to this record.
    pub fn finalize_send(&mut self, outcome: SendOutcomeRecord) {
        self.status = outcome.status;
        self.provider_status = outcome.provider_status;
        self.attempts = outcome.attempts;
        self.attempt_history = outcome.attempt_history;
        self.provider_body = outcome.body;
        self.error = outcome.error;
        self.touch();
    }

    /// Record one open: increments the counter and appends the event
    /// together.
    pub fn record_open(&mut self, at: DateTime<Utc>, fingerprint: Option<String>) {
        self.open_count += 1;
        self.open_events.push(OpenEvent { at, fingerprint });
        self.touch_at(at);
    }

    /// Record one click: increments the counter and appends the event
    /// together.
    pub fn record_click(&mut self, at: DateTime<Utc>) {
        self.click_count += 1;
        self.click_events.push(at);
        self.touch_at(at);
    }

    pub fn mark_delivered(&mut self, at: DateTime<Utc>) {
        self.status = DeliveryStatus::Delivered;
        self.delivered_at = Some(at);
        self.touch_at(at);
    }

    pub fn mark_bounced(&mut self, at: DateTime<Utc>) {
        self.status = DeliveryStatus::Bounced;
        self.bounced_at = Some(at);
        self.touch_at(at);
    }

    pub fn mark_spam_reported(&mut self, at: DateTime<Utc>) {
        self.status = DeliveryStatus::SpamReported;
        self.spam_reported_at = Some(at);
        self.touch_at(at);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn touch_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}
