//! In-memory store backends.
//!
//! Records live in a `DashMap`; every mutation happens through `get_mut`,
//! which holds the shard lock for the duration of the update, so counter
//! increments and event appends are atomic with respect to concurrent
//! webhook batches and tracking requests.

use async_trait::async_trait;
use broadside_common::id::compat;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::{
    CampaignRecord, CampaignStat, CampaignStats, CampaignStore, DeliveryLogRecord, LogStore,
    RecordId, RecordKey, Result, SendOutcomeRecord,
};

/// In-memory delivery log store with secondary indexes for the three
/// engagement lookup paths.
#[derive(Debug, Default, Clone)]
pub struct MemoryLogStore {
    records: DashMap<RecordId, DeliveryLogRecord>,
    by_token: DashMap<String, RecordId>,
    by_click: DashMap<String, RecordId>,
    by_recipient: DashMap<(String, String), RecordId>,
}

impl MemoryLogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn resolve_id(&self, key: &RecordKey) -> Option<RecordId> {
        match key {
            RecordKey::Token(token) => self.by_token.get(token).map(|e| e.value().clone()),
            RecordKey::Click(click_id) => self.by_click.get(click_id).map(|e| e.value().clone()),
            RecordKey::CampaignRecipient { campaign, email } => {
                // Raw string first, then the legacy typed-identifier form.
                compat::lookup_candidates(campaign).into_iter().find_map(|candidate| {
                    self.by_recipient
                        .get(&(candidate, email.clone()))
                        .map(|e| e.value().clone())
                })
            }
        }
    }

    fn with_record<F>(&self, key: &RecordKey, mutate: F) -> bool
    where
        F: FnOnce(&mut DeliveryLogRecord),
    {
        let Some(id) = self.resolve_id(key) else {
            return false;
        };
        match self.records.get_mut(&id) {
            Some(mut entry) => {
                mutate(entry.value_mut());
                true
            }
            None => false,
        }
    }

    fn index(&self, record: &DeliveryLogRecord) {
        if let Some(token) = &record.tracking_token {
            self.by_token.insert(token.clone(), record.id.clone());
        }
        for click_id in record.click_map.keys() {
            self.by_click.insert(click_id.clone(), record.id.clone());
        }
        self.by_recipient.insert(
            (record.campaign_id.clone(), record.email.clone()),
            record.id.clone(),
        );
    }

    fn unindex(&self, record: &DeliveryLogRecord) {
        if let Some(token) = &record.tracking_token {
            self.by_token.remove(token);
        }
        for click_id in record.click_map.keys() {
            self.by_click.remove(click_id);
        }
        self.by_recipient
            .remove(&(record.campaign_id.clone(), record.email.clone()));
    }

    fn campaign_matches(&self, record_campaign: &str, raw: &str) -> bool {
        compat::lookup_candidates(raw)
            .iter()
            .any(|candidate| candidate == record_campaign)
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn insert(&self, record: DeliveryLogRecord) -> Result<RecordId> {
        let id = record.id.clone();
        self.index(&record);
        self.records.insert(id.clone(), record);
        Ok(id)
    }

    async fn finalize_send(&self, id: &RecordId, outcome: SendOutcomeRecord) -> Result<()> {
        match self.records.get_mut(id) {
            Some(mut entry) => {
                entry.value_mut().finalize_send(outcome);
                Ok(())
            }
            None => Err(crate::StoreError::RecordNotFound(id.to_string())),
        }
    }

    async fn record_open(
        &self,
        key: &RecordKey,
        at: DateTime<Utc>,
        fingerprint: Option<String>,
    ) -> Result<bool> {
        Ok(self.with_record(key, |record| record.record_open(at, fingerprint)))
    }

    async fn record_click(&self, key: &RecordKey, at: DateTime<Utc>) -> Result<bool> {
        Ok(self.with_record(key, |record| record.record_click(at)))
    }

    async fn mark_delivered(&self, key: &RecordKey, at: DateTime<Utc>) -> Result<bool> {
        Ok(self.with_record(key, |record| record.mark_delivered(at)))
    }

    async fn mark_bounced(&self, key: &RecordKey, at: DateTime<Utc>) -> Result<bool> {
        Ok(self.with_record(key, |record| record.mark_bounced(at)))
    }

    async fn mark_spam_reported(&self, key: &RecordKey, at: DateTime<Utc>) -> Result<bool> {
        Ok(self.with_record(key, |record| record.mark_spam_reported(at)))
    }

    async fn find(&self, key: &RecordKey) -> Result<Option<DeliveryLogRecord>> {
        Ok(self
            .resolve_id(key)
            .and_then(|id| self.records.get(&id).map(|e| e.value().clone())))
    }

    async fn ensure_record(
        &self,
        campaign: &str,
        email: &str,
        at: DateTime<Utc>,
    ) -> Result<RecordId> {
        let key = RecordKey::CampaignRecipient {
            campaign: campaign.to_string(),
            email: email.to_string(),
        };
        if let Some(id) = self.resolve_id(&key) {
            return Ok(id);
        }

        let record = DeliveryLogRecord::zero_state(campaign, email, at);
        tracing::debug!(
            campaign = %campaign,
            email = %email,
            "No delivery log on file, creating zero-state record"
        );
        self.insert(record).await
    }

    async fn campaign_records(&self, campaign: &str) -> Result<Vec<DeliveryLogRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|entry| self.campaign_matches(&entry.value().campaign_id, campaign))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn recent_records(
        &self,
        campaign: &str,
        created_before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<DeliveryLogRecord>> {
        let mut matches: Vec<DeliveryLogRecord> = self
            .records
            .iter()
            .filter(|entry| self.campaign_matches(&entry.value().campaign_id, campaign))
            .filter(|entry| created_before.is_none_or(|cursor| entry.value().created_at < cursor))
            .map(|entry| entry.value().clone())
            .collect();

        // Newest first; record id breaks created_at ties deterministically.
        matches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.to_string().cmp(&a.id.to_string()))
        });
        matches.truncate(limit);
        Ok(matches)
    }

    async fn purge_recipient(&self, email: &str) -> Result<usize> {
        let ids: Vec<RecordId> = self
            .records
            .iter()
            .filter(|entry| entry.value().email == email)
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for id in ids {
            if let Some((_, record)) = self.records.remove(&id) {
                self.unindex(&record);
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// In-memory campaign registry.
#[derive(Debug, Default, Clone)]
pub struct MemoryCampaignStore {
    campaigns: DashMap<String, CampaignRecord>,
}

impl MemoryCampaignStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CampaignStore for MemoryCampaignStore {
    async fn register(&self, campaign: CampaignRecord) -> Result<()> {
        self.campaigns.insert(campaign.id.clone(), campaign);
        Ok(())
    }

    async fn resolve(&self, raw: &str) -> Result<Option<String>> {
        Ok(compat::lookup_candidates(raw)
            .into_iter()
            .find(|candidate| self.campaigns.contains_key(candidate)))
    }

    async fn bump_stat(&self, id: &str, stat: CampaignStat) -> Result<bool> {
        match self.campaigns.get_mut(id) {
            Some(mut entry) => {
                entry.value_mut().stats.bump(stat);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn stats(&self, raw: &str) -> Result<Option<CampaignStats>> {
        Ok(compat::lookup_candidates(raw)
            .into_iter()
            .find_map(|candidate| self.campaigns.get(&candidate).map(|e| e.value().stats)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record_with_token(campaign: &str, email: &str, token: &str) -> DeliveryLogRecord {
        let mut record = DeliveryLogRecord::pending(campaign, email, None, "Subject");
        record.tracking_token = Some(token.to_string());
        record
    }

    #[tokio::test]
    async fn open_by_token_updates_counters_atomically() {
        let store = MemoryLogStore::new();
        store
            .insert(record_with_token("c1", "a@x.com", "tok-1"))
            .await
            .unwrap();

        let key = RecordKey::Token("tok-1".to_string());
        assert!(store.record_open(&key, Utc::now(), None).await.unwrap());
        assert!(store.record_open(&key, Utc::now(), None).await.unwrap());

        let record = store.find(&key).await.unwrap().unwrap();
        assert_eq!(record.open_count, 2);
        assert_eq!(record.open_events.len(), 2);
    }

    #[tokio::test]
    async fn unknown_keys_are_noops() {
        let store = MemoryLogStore::new();
        let key = RecordKey::Click("missing".to_string());
        assert!(!store.record_click(&key, Utc::now()).await.unwrap());
        assert!(store.find(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recipient_lookup_falls_back_to_canonical_ulid() {
        let store = MemoryLogStore::new();
        let canonical = ulid::Ulid::new().to_string();
        store
            .insert(DeliveryLogRecord::pending(
                canonical.clone(),
                "a@x.com",
                None,
                "Subject",
            ))
            .await
            .unwrap();

        // A webhook may hand us the identifier lowercased.
        let key = RecordKey::CampaignRecipient {
            campaign: canonical.to_lowercase(),
            email: "a@x.com".to_string(),
        };
        assert!(store.record_open(&key, Utc::now(), None).await.unwrap());
    }

    #[tokio::test]
    async fn ensure_record_creates_zero_state_once() {
        let store = MemoryLogStore::new();
        let at = Utc::now();
        let first = store.ensure_record("c1", "new@x.com", at).await.unwrap();
        let second = store.ensure_record("c1", "new@x.com", at).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);

        let record = store
            .find(&RecordKey::CampaignRecipient {
                campaign: "c1".to_string(),
                email: "new@x.com".to_string(),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.open_count, 0);
        assert_eq!(record.click_count, 0);
    }

    #[tokio::test]
    async fn recent_records_pages_newest_first() {
        let store = MemoryLogStore::new();
        let base = Utc::now();
        for i in 0..5 {
            let mut record = DeliveryLogRecord::pending("c1", format!("r{i}@x.com"), None, "S");
            record.created_at = base + chrono::Duration::seconds(i);
            store.insert(record).await.unwrap();
        }

        let page = store.recent_records("c1", None, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].email, "r4@x.com");
        assert_eq!(page[1].email, "r3@x.com");

        let next = store
            .recent_records("c1", Some(page[1].created_at), 2)
            .await
            .unwrap();
        assert_eq!(next[0].email, "r2@x.com");
        assert_eq!(next[1].email, "r1@x.com");
    }

    #[tokio::test]
    async fn purge_recipient_removes_records_and_indexes() {
        let store = MemoryLogStore::new();
        store
            .insert(record_with_token("c1", "gone@x.com", "tok-gone"))
            .await
            .unwrap();
        store
            .insert(record_with_token("c2", "gone@x.com", "tok-gone-2"))
            .await
            .unwrap();
        store
            .insert(record_with_token("c1", "stays@x.com", "tok-stays"))
            .await
            .unwrap();

        assert_eq!(store.purge_recipient("gone@x.com").await.unwrap(), 2);
        assert_eq!(store.len(), 1);
        assert!(
            store
                .find(&RecordKey::Token("tok-gone".to_string()))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn campaign_store_resolves_and_bumps() {
        let store = MemoryCampaignStore::new();
        store
            .register(CampaignRecord::new("c1", "Summer Sale"))
            .await
            .unwrap();

        let resolved = store.resolve("c1").await.unwrap().unwrap();
        assert_eq!(resolved, "c1");
        assert!(store.resolve("missing").await.unwrap().is_none());

        assert!(store.bump_stat("c1", CampaignStat::Clicks).await.unwrap());
        assert!(!store.bump_stat("nope", CampaignStat::Clicks).await.unwrap());
        assert_eq!(store.stats("c1").await.unwrap().unwrap().clicks, 1);
    }
}
