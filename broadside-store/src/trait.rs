//! Storage traits for delivery logs and campaign counters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    CampaignRecord, CampaignStat, CampaignStats, DeliveryLogRecord, RecordId, RecordKey, Result,
    SendOutcomeRecord,
};

/// Persisted collection of per-recipient delivery outcomes and engagement
/// counters.
///
/// Engagement mutations (`record_open`, `record_click`, the `mark_*`
/// family) must be atomic at the storage layer: two webhook batches
/// touching the same record concurrently must never lose an increment or
/// an appended event. The boolean they return reports whether a record
/// matched the key; an unmatched key is a no-op, not an error.
#[async_trait]
pub trait LogStore: Send + Sync + std::fmt::Debug {
    /// Insert a new record, indexing its tracking token and click map.
    async fn insert(&self, record: DeliveryLogRecord) -> Result<RecordId>;

    /// Finalize a pending record with the terminal outcome of its send.
    async fn finalize_send(&self, id: &RecordId, outcome: SendOutcomeRecord) -> Result<()>;

    /// Record an open event against the record matching `key`.
    async fn record_open(
        &self,
        key: &RecordKey,
        at: DateTime<Utc>,
        fingerprint: Option<String>,
    ) -> Result<bool>;

    /// Record a click event against the record matching `key`.
    async fn record_click(&self, key: &RecordKey, at: DateTime<Utc>) -> Result<bool>;

    async fn mark_delivered(&self, key: &RecordKey, at: DateTime<Utc>) -> Result<bool>;

    async fn mark_bounced(&self, key: &RecordKey, at: DateTime<Utc>) -> Result<bool>;

    async fn mark_spam_reported(&self, key: &RecordKey, at: DateTime<Utc>) -> Result<bool>;

    /// Look up a record by key, applying the legacy-identifier fallback
    /// for campaign-scoped keys.
    async fn find(&self, key: &RecordKey) -> Result<Option<DeliveryLogRecord>>;

    /// Create a zero-state record for (campaign, recipient) unless one
    /// already exists. Returns the id of the existing or created record.
    async fn ensure_record(
        &self,
        campaign: &str,
        email: &str,
        at: DateTime<Utc>,
    ) -> Result<RecordId>;

    /// All records for a campaign, in unspecified order.
    async fn campaign_records(&self, campaign: &str) -> Result<Vec<DeliveryLogRecord>>;

    /// Most recent records first, filtered to `created_at < created_before`
    /// when a cursor is given.
    async fn recent_records(
        &self,
        campaign: &str,
        created_before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<DeliveryLogRecord>>;

    /// Unsubscribe cascade cleanup: delete every record for a recipient.
    /// Returns the number of records removed.
    async fn purge_recipient(&self, email: &str) -> Result<usize>;
}

/// Campaign registry and campaign-level running counters.
#[async_trait]
pub trait CampaignStore: Send + Sync + std::fmt::Debug {
    async fn register(&self, campaign: CampaignRecord) -> Result<()>;

    /// Resolve a raw campaign identifier to its canonical form, applying
    /// the legacy-identifier fallback.
    async fn resolve(&self, raw: &str) -> Result<Option<String>>;

    /// Atomically increment one campaign-level counter.
    async fn bump_stat(&self, id: &str, stat: CampaignStat) -> Result<bool>;

    async fn stats(&self, raw: &str) -> Result<Option<CampaignStats>>;
}
