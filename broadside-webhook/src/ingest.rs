//! Idempotent application of engagement events to delivery log records.

use std::sync::Arc;

use broadside_store::{CampaignStat, CampaignStore, LogStore, RecordKey};
use serde::Serialize;

use crate::{EventKind, RawEngagementEvent, WebhookError, WebhookVerifier};

/// Counts reported back once a batch has been iterated.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct IngestReport {
    pub processed: usize,
    pub skipped: usize,
}

/// Signature-verification mode for inbound batches.
#[derive(Debug)]
pub enum Verification {
    /// Explicit configuration opt-out: skip straight to parsing.
    Disabled,
    Enabled(WebhookVerifier),
    /// Verification is on but no public key was configured; every batch
    /// is rejected until one is.
    MissingKey,
}

/// Applies provider webhook batches to the delivery log store.
///
/// Events within one batch are processed sequentially; concurrent batches
/// are safe because every record mutation is atomic at the storage layer.
#[derive(Debug)]
pub struct WebhookIngestor {
    store: Arc<dyn LogStore>,
    campaigns: Arc<dyn CampaignStore>,
    verification: Verification,
}

impl WebhookIngestor {
    pub fn new(
        store: Arc<dyn LogStore>,
        campaigns: Arc<dyn CampaignStore>,
        verification: Verification,
    ) -> Self {
        Self {
            store,
            campaigns,
            verification,
        }
    }

    /// Authenticate, parse, and apply one inbound batch.
    ///
    /// Authentication or a non-list body rejects the whole batch; after
    /// that, each event is applied independently and failures are skipped.
    pub async fn ingest(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<IngestReport, WebhookError> {
        match &self.verification {
            Verification::Disabled => {}
            Verification::MissingKey => return Err(WebhookError::MissingPublicKey),
            Verification::Enabled(verifier) => {
                let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
                    return Err(WebhookError::MissingSignatureHeaders);
                };
                verifier.verify(timestamp, body, signature)?;
            }
        }

        let events = match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(serde_json::Value::Array(events)) => events,
            Ok(_) => {
                return Err(WebhookError::InvalidPayload(
                    "expected a list of events".to_string(),
                ));
            }
            Err(e) => return Err(WebhookError::InvalidPayload(e.to_string())),
        };

        let mut report = IngestReport::default();
        for event in events {
            if self.apply_event(event).await {
                report.processed += 1;
            } else {
                report.skipped += 1;
            }
        }

        tracing::info!(
            processed = report.processed,
            skipped = report.skipped,
            "Processed webhook event batch"
        );
        Ok(report)
    }

    /// Apply one event. Returns `false` when the event was skipped; a
    /// skipped event never aborts the batch.
    async fn apply_event(&self, value: serde_json::Value) -> bool {
        let event: RawEngagementEvent = match serde_json::from_value(value) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed webhook event");
                return false;
            }
        };

        let (Some(email), Some(kind), Some(at)) =
            (event.email.clone(), event.event, event.occurred_at())
        else {
            tracing::warn!(?event, "Skipping webhook event missing required fields");
            return false;
        };
        let Some(campaign) = event.resolve_campaign_id() else {
            tracing::warn!(email = %email, kind = ?kind, "Skipping webhook event with no campaign identifier");
            return false;
        };

        // Resolve or create the log record, then apply the kind-specific
        // mutation.
        if let Err(e) = self.store.ensure_record(&campaign, &email, at).await {
            tracing::warn!(campaign = %campaign, email = %email, error = %e, "Failed to resolve delivery log record");
            return false;
        }
        let key = RecordKey::CampaignRecipient {
            campaign: campaign.clone(),
            email: email.clone(),
        };

        let applied = match kind {
            EventKind::Open => self.store.record_open(&key, at, None).await,
            EventKind::Click => self.store.record_click(&key, at).await,
            EventKind::Bounce => self.store.mark_bounced(&key, at).await,
            EventKind::Delivered => self.store.mark_delivered(&key, at).await,
            EventKind::SpamReport => self.store.mark_spam_reported(&key, at).await,
        };
        if let Err(e) = applied {
            tracing::warn!(campaign = %campaign, email = %email, error = %e, "Failed to apply webhook event");
            return false;
        }
        tracing::debug!(campaign = %campaign, email = %email, kind = ?kind, "Applied webhook event");

        // Campaign-level counter, only when the campaign resolves. An
        // unresolved campaign skips just this increment.
        let stat = match kind {
            EventKind::Open => Some(CampaignStat::Opens),
            EventKind::Click => Some(CampaignStat::Clicks),
            EventKind::Bounce => Some(CampaignStat::Bounces),
            EventKind::SpamReport => Some(CampaignStat::SpamReports),
            EventKind::Delivered => None,
        };
        if let Some(stat) = stat {
            match self.campaigns.resolve(&campaign).await {
                Ok(Some(id)) => {
                    if let Err(e) = self.campaigns.bump_stat(&id, stat).await {
                        tracing::warn!(campaign = %id, error = %e, "Failed to bump campaign counter");
                    }
                }
                Ok(None) => {
                    tracing::debug!(campaign = %campaign, "Campaign not registered, skipping counter update");
                }
                Err(e) => {
                    tracing::warn!(campaign = %campaign, error = %e, "Campaign lookup failed");
                }
            }
        }

        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use broadside_common::DeliveryStatus;
    use broadside_store::{
        CampaignRecord, DeliveryLogRecord, MemoryCampaignStore, MemoryLogStore,
    };
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    const T: i64 = 1_700_000_000;

    struct Fixture {
        store: Arc<MemoryLogStore>,
        campaigns: Arc<MemoryCampaignStore>,
        ingestor: WebhookIngestor,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryLogStore::new());
        let campaigns = Arc::new(MemoryCampaignStore::new());
        let ingestor = WebhookIngestor::new(
            Arc::clone(&store) as Arc<dyn LogStore>,
            Arc::clone(&campaigns) as Arc<dyn CampaignStore>,
            Verification::Disabled,
        );
        Fixture {
            store,
            campaigns,
            ingestor,
        }
    }

    async fn seed_record(fixture: &Fixture, campaign: &str, email: &str) {
        fixture
            .store
            .insert(DeliveryLogRecord::pending(campaign, email, None, "S"))
            .await
            .unwrap();
    }

    fn key(campaign: &str, email: &str) -> RecordKey {
        RecordKey::CampaignRecipient {
            campaign: campaign.to_string(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn open_then_click_updates_one_record() {
        let fixture = fixture();
        seed_record(&fixture, "c1", "a@x.com").await;

        let body = json!([
            {"event": "open", "email": "a@x.com", "campaign_id": "c1", "timestamp": T},
            {"event": "click", "email": "a@x.com", "campaign_id": "c1", "timestamp": T + 5},
        ]);
        let report = fixture
            .ingestor
            .ingest(None, None, body.to_string().as_bytes())
            .await
            .unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.skipped, 0);

        let record = fixture
            .store
            .find(&key("c1", "a@x.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.open_count, 1);
        assert_eq!(record.click_count, 1);
        assert_eq!(record.open_events.len(), 1);
        assert_eq!(record.click_events.len(), 1);
    }

    #[tokio::test]
    async fn replayed_events_are_applied_twice_by_design() {
        let fixture = fixture();
        seed_record(&fixture, "c1", "a@x.com").await;

        let body = json!([
            {"event": "open", "email": "a@x.com", "campaign_id": "c1", "timestamp": T},
        ])
        .to_string();
        fixture.ingestor.ingest(None, None, body.as_bytes()).await.unwrap();
        fixture.ingestor.ingest(None, None, body.as_bytes()).await.unwrap();

        let record = fixture
            .store
            .find(&key("c1", "a@x.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.open_count, 2);
        assert_eq!(record.open_events.len(), 2);
    }

    #[tokio::test]
    async fn missing_campaign_id_skips_without_aborting_the_batch() {
        let fixture = fixture();
        seed_record(&fixture, "c1", "b@x.com").await;

        let body = json!([
            {"event": "open", "email": "a@x.com", "timestamp": T},
            {"event": "open", "email": "b@x.com", "campaign_id": "c1", "timestamp": T},
        ]);
        let report = fixture
            .ingestor
            .ingest(None, None, body.to_string().as_bytes())
            .await
            .unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.skipped, 1);

        let record = fixture
            .store
            .find(&key("c1", "b@x.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.open_count, 1);
    }

    #[tokio::test]
    async fn malformed_events_are_skipped_individually() {
        let fixture = fixture();
        seed_record(&fixture, "c1", "a@x.com").await;

        let body = json!([
            {"event": "teleported", "email": "a@x.com", "campaign_id": "c1", "timestamp": T},
            "not an object",
            {"event": "open", "email": "a@x.com", "campaign_id": "c1", "timestamp": T},
        ]);
        let report = fixture
            .ingestor
            .ingest(None, None, body.to_string().as_bytes())
            .await
            .unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.skipped, 2);
    }

    #[tokio::test]
    async fn unknown_recipient_gets_a_zero_state_record() {
        let fixture = fixture();

        let body = json!([
            {"event": "open", "email": "new@x.com", "campaign_id": "c9", "timestamp": T},
        ]);
        fixture
            .ingestor
            .ingest(None, None, body.to_string().as_bytes())
            .await
            .unwrap();

        let record = fixture
            .store
            .find(&key("c9", "new@x.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.open_count, 1);
        assert_eq!(record.attempts, 0);
    }

    #[tokio::test]
    async fn status_events_stamp_the_record() {
        let fixture = fixture();
        seed_record(&fixture, "c1", "a@x.com").await;

        let body = json!([
            {"event": "delivered", "email": "a@x.com", "campaign_id": "c1", "timestamp": T},
            {"event": "bounce", "email": "a@x.com", "campaign_id": "c1", "timestamp": T + 10},
        ]);
        fixture
            .ingestor
            .ingest(None, None, body.to_string().as_bytes())
            .await
            .unwrap();

        let record = fixture
            .store
            .find(&key("c1", "a@x.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, DeliveryStatus::Bounced);
        assert!(record.delivered_at.is_some());
        assert!(record.bounced_at.is_some());
    }

    #[tokio::test]
    async fn campaign_counters_bump_only_for_registered_campaigns() {
        let fixture = fixture();
        fixture
            .campaigns
            .register(CampaignRecord::new("c1", "Known"))
            .await
            .unwrap();
        seed_record(&fixture, "c1", "a@x.com").await;
        seed_record(&fixture, "ghost", "a@x.com").await;

        let body = json!([
            {"event": "open", "email": "a@x.com", "campaign_id": "c1", "timestamp": T},
            {"event": "open", "email": "a@x.com", "campaign_id": "ghost", "timestamp": T},
        ]);
        let report = fixture
            .ingestor
            .ingest(None, None, body.to_string().as_bytes())
            .await
            .unwrap();

        // Both records were updated even though only one campaign resolved.
        assert_eq!(report.processed, 2);
        let known = fixture.campaigns.stats("c1").await.unwrap().unwrap();
        assert_eq!(known.opens, 1);
        assert!(fixture.campaigns.stats("ghost").await.unwrap().is_none());

        let ghost_record = fixture
            .store
            .find(&key("ghost", "a@x.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ghost_record.open_count, 1);
    }

    #[tokio::test]
    async fn non_list_bodies_are_rejected() {
        let fixture = fixture();
        let err = fixture
            .ingestor
            .ingest(None, None, br#"{"event": "open"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::InvalidPayload(_)));

        let err = fixture
            .ingestor
            .ingest(None, None, b"not json")
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn verification_requires_both_headers() {
        use p256::ecdsa::SigningKey;
        use p256::pkcs8::{EncodePublicKey, LineEnding};

        let signing = SigningKey::random(&mut rand_core::OsRng);
        let pem = signing
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        let verifier = WebhookVerifier::from_key_material(&pem).unwrap();

        let store = Arc::new(MemoryLogStore::new());
        let campaigns = Arc::new(MemoryCampaignStore::new());
        let ingestor = WebhookIngestor::new(store, campaigns, Verification::Enabled(verifier));

        let err = ingestor.ingest(None, None, b"[]").await.unwrap_err();
        assert!(matches!(err, WebhookError::MissingSignatureHeaders));

        let err = ingestor
            .ingest(Some("1700000000"), None, b"[]")
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::MissingSignatureHeaders));
    }

    #[tokio::test]
    async fn verified_batches_are_processed() {
        use base64::Engine;
        use base64::engine::general_purpose::STANDARD;
        use p256::ecdsa::{Signature, SigningKey, signature::Signer};
        use p256::pkcs8::{EncodePublicKey, LineEnding};

        let signing = SigningKey::random(&mut rand_core::OsRng);
        let pem = signing
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        let verifier = WebhookVerifier::from_key_material(&pem).unwrap();

        let store = Arc::new(MemoryLogStore::new());
        let campaigns = Arc::new(MemoryCampaignStore::new());
        let ingestor = WebhookIngestor::new(
            Arc::clone(&store) as Arc<dyn LogStore>,
            campaigns,
            Verification::Enabled(verifier),
        );

        let body = json!([
            {"event": "open", "email": "a@x.com", "campaign_id": "c1", "timestamp": T},
        ])
        .to_string();
        let timestamp = "1700000000";
        let mut signed = Vec::new();
        signed.extend_from_slice(timestamp.as_bytes());
        signed.extend_from_slice(body.as_bytes());
        let signature: Signature = signing.sign(&signed);
        let signature_b64 = STANDARD.encode(signature.to_der().as_bytes());

        let report = ingestor
            .ingest(Some(timestamp), Some(&signature_b64), body.as_bytes())
            .await
            .unwrap();
        assert_eq!(report.processed, 1);

        // Tampering with the body after signing rejects the whole batch.
        let err = ingestor
            .ingest(Some(timestamp), Some(&signature_b64), b"[]")
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));
        assert_eq!(store.len(), 1);
    }
}
